use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::ContextError;
use crate::gpu::{RenderBackend, WgpuBackend};
use crate::types::{FramebufferSize, SurfaceSize};

/// Drawing surface plus the GPU backend bound to it.
///
/// Owns the backend exclusively. [`RenderSurface::destroy`] releases the GPU
/// context exactly once; afterwards the backend is gone and every operation
/// is a no-op.
pub struct RenderSurface<B: RenderBackend> {
    backend: Option<B>,
    size: SurfaceSize,
}

impl RenderSurface<WgpuBackend> {
    /// Opens a wgpu surface on `target` at `width`x`height` logical pixels.
    pub fn initialize<T>(
        target: &T,
        width: u32,
        height: u32,
        pixel_ratio: f32,
    ) -> Result<Self, ContextError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let size = SurfaceSize::new(width, height, pixel_ratio);
        if size.is_empty() {
            return Err(ContextError::EmptySurface { width, height });
        }
        let backend = WgpuBackend::connect(target, size.framebuffer())?;
        tracing::debug!(
            width,
            height,
            pixel_ratio = size.pixel_ratio,
            "initialised render surface"
        );
        Ok(Self {
            backend: Some(backend),
            size,
        })
    }
}

impl<B: RenderBackend> RenderSurface<B> {
    /// Wraps an already connected backend.
    pub fn with_backend(backend: B, size: SurfaceSize) -> Result<Self, ContextError> {
        if size.is_empty() {
            return Err(ContextError::EmptySurface {
                width: size.width,
                height: size.height,
            });
        }
        Ok(Self {
            backend: Some(backend),
            size,
        })
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn framebuffer_size(&self) -> FramebufferSize {
        self.size.framebuffer()
    }

    /// Applies a new logical size. Zero dimensions are ignored so the last
    /// drawable size stays in effect while a window is minimised.
    pub fn resize(&mut self, size: SurfaceSize) -> bool {
        if size.is_empty() || size == self.size {
            return false;
        }
        let Some(backend) = self.backend.as_mut() else {
            return false;
        };
        self.size = size;
        backend.resize_surface(size.framebuffer());
        true
    }

    pub fn backend_mut(&mut self) -> Option<&mut B> {
        self.backend.as_mut()
    }

    pub fn is_destroyed(&self) -> bool {
        self.backend.is_none()
    }

    /// Releases the GPU context. Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.release_context();
        }
    }
}

impl<B: RenderBackend> Drop for RenderSurface<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
