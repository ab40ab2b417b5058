//! GPU seam between the scene graph and wgpu.
//!
//! Scene objects never hold wgpu handles directly. They hold typed ids minted
//! by a [`RenderBackend`] and hand them back when drawing or releasing:
//! - `context` owns the wgpu instance, device, queue and surface, and knows
//!   how to reconfigure the swapchain when the window resizes.
//! - `pipeline` turns a [`ShaderProgram`] into a render pipeline with its
//!   uniform buffer and bind groups.
//! - `targets` allocates offscreen color and depth buffers.
//! - `uniforms` mirrors the std140 blocks declared by the shaders.
//! - `backend` glues everything together as [`WgpuBackend`].

mod backend;
mod context;
mod pipeline;
#[cfg(test)]
pub(crate) mod recording;
mod targets;
mod uniforms;

pub use backend::WgpuBackend;
pub use uniforms::{MeshUniforms, NoiseUniforms};

use crate::compile::ShaderProgram;
use crate::error::RenderError;
use crate::mesh::TorusGeometry;
use crate::types::FramebufferSize;

/// Untyped handle to any backend-owned resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

macro_rules! typed_resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(ResourceId);

        impl $name {
            pub fn new(id: ResourceId) -> Self {
                Self(id)
            }

            pub fn id(self) -> ResourceId {
                self.0
            }
        }

        impl From<$name> for ResourceId {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

typed_resource_id!(
    /// Uploaded vertex and index buffers.
    GeometryId
);
typed_resource_id!(
    /// Compiled pipeline with its uniform buffer.
    ProgramId
);
typed_resource_id!(
    /// Offscreen color buffer with a matching depth buffer.
    TargetId
);

/// Where a pass writes its color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutput {
    Target(TargetId),
    Screen,
}

#[derive(Debug, Clone, Copy)]
pub struct MeshDraw<'a> {
    pub program: ProgramId,
    pub geometry: GeometryId,
    pub uniforms: &'a [u8],
}

#[derive(Debug, Clone, Copy)]
pub struct FullscreenDraw<'a> {
    pub program: ProgramId,
    /// Color buffer sampled as `tDiffuse`.
    pub input: TargetId,
    pub uniforms: &'a [u8],
}

/// Everything the scene graph needs from a GPU.
///
/// Each `create_*` call mints a resource that must be handed back to
/// [`RenderBackend::release`] exactly once. Draws are only valid between
/// [`RenderBackend::begin_frame`] returning `Ok(true)` and
/// [`RenderBackend::end_frame`].
pub trait RenderBackend {
    /// Reconfigures the presentable surface to the new framebuffer size.
    fn resize_surface(&mut self, size: FramebufferSize);

    fn create_geometry(&mut self, geometry: &TorusGeometry) -> Result<GeometryId, RenderError>;

    fn create_program(&mut self, program: &ShaderProgram) -> Result<ProgramId, RenderError>;

    fn create_target(&mut self, size: FramebufferSize) -> Result<TargetId, RenderError>;

    fn resize_target(&mut self, target: TargetId, size: FramebufferSize)
        -> Result<(), RenderError>;

    fn release(&mut self, resource: ResourceId);

    /// Acquires the next surface image. `Ok(false)` means the frame should
    /// be skipped, for example while the surface is being reconfigured.
    fn begin_frame(&mut self) -> Result<bool, RenderError>;

    fn draw_mesh(&mut self, draw: &MeshDraw<'_>, output: PassOutput) -> Result<(), RenderError>;

    fn draw_fullscreen(
        &mut self,
        draw: &FullscreenDraw<'_>,
        output: PassOutput,
    ) -> Result<(), RenderError>;

    /// Submits recorded work and presents the surface image.
    fn end_frame(&mut self);

    /// Tears down the device and surface. Called once, after every resource
    /// has been released.
    fn release_context(&mut self);
}
