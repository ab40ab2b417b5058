use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::ContextError;
use crate::types::FramebufferSize;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) struct GpuContext {
    pub _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub surface_format: wgpu::TextureFormat,
    pub max_dimension: u32,
}

impl GpuContext {
    pub(crate) fn new<T>(target: &T, initial_size: FramebufferSize) -> Result<Self, ContextError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        if initial_size.width == 0 || initial_size.height == 0 {
            return Err(ContextError::EmptySurface {
                width: initial_size.width,
                height: initial_size.height,
            });
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = target.window_handle().map_err(|err| {
            ContextError::SurfaceUnavailable(format!("failed to acquire window handle: {err}"))
        })?;
        let display_handle = target.display_handle().map_err(|err| {
            ContextError::SurfaceUnavailable(format!("failed to acquire display handle: {err}"))
        })?;

        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| ContextError::SurfaceUnavailable(err.to_string()))?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| ContextError::Adapter(err.to_string()))?;

        let adapter_info = adapter.get_info();
        let limits = adapter.limits();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            device_type = ?adapter_info.device_type,
            "selected GPU adapter"
        );

        let max_dimension = limits.max_texture_dimension_2d;
        if initial_size.width > max_dimension || initial_size.height > max_dimension {
            return Err(ContextError::TooLarge {
                width: initial_size.width,
                height: initial_size.height,
                limit: max_dimension,
            });
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let Some(&first_format) = surface_caps.formats.first() else {
            return Err(ContextError::SurfaceUnavailable(
                "surface reports no supported formats".to_string(),
            ));
        };
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or_else(|| {
                tracing::warn!(
                    fallback = ?first_format,
                    "no sRGB surface format available; colors will look washed out"
                );
                first_format
            });

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("torusglow device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| ContextError::Device(err.to_string()))?;

        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .or_else(|| surface_caps.present_modes.first().copied())
            .unwrap_or(wgpu::PresentMode::Fifo);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        tracing::debug!(?present_mode, ?surface_format, "configuring surface");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: initial_size.width,
            height: initial_size.height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_format,
            max_dimension,
        })
    }

    /// Sizes above the adapter limit are clamped rather than rejected.
    pub(crate) fn resize(&mut self, new_size: FramebufferSize) -> FramebufferSize {
        let applied = self.clamp(new_size);
        if applied != new_size {
            tracing::warn!(
                requested_width = new_size.width,
                requested_height = new_size.height,
                limit = self.max_dimension,
                "surface size clamped to GPU texture limit"
            );
        }
        self.config.width = applied.width;
        self.config.height = applied.height;
        self.surface.configure(&self.device, &self.config);
        applied
    }

    pub(crate) fn clamp(&self, size: FramebufferSize) -> FramebufferSize {
        size.clamped_to(self.max_dimension)
    }

    /// Reapplies the current configuration after the surface was lost.
    pub(crate) fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub(crate) fn size(&self) -> FramebufferSize {
        FramebufferSize::new(self.config.width, self.config.height)
    }
}
