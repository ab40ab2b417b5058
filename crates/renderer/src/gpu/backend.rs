use std::collections::HashMap;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;

use crate::compile::{ProgramKind, ShaderProgram};
use crate::error::{ContextError, RenderError};
use crate::mesh::TorusGeometry;
use crate::types::FramebufferSize;

use super::context::GpuContext;
use super::pipeline::{input_bind_group, ProgramResources};
use super::targets::{ColorTarget, DepthBuffer};
use super::{
    FullscreenDraw, GeometryId, MeshDraw, PassOutput, ProgramId, RenderBackend, ResourceId,
    TargetId,
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.04,
    a: 1.0,
};

struct GpuGeometry {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct ActiveFrame {
    surface_texture: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

/// [`RenderBackend`] that draws into a window surface through wgpu.
pub struct WgpuBackend {
    context: Option<GpuContext>,
    screen_depth: Option<DepthBuffer>,
    sampler: Option<wgpu::Sampler>,
    geometries: HashMap<ResourceId, GpuGeometry>,
    programs: HashMap<ResourceId, ProgramResources>,
    targets: HashMap<ResourceId, ColorTarget>,
    frame: Option<ActiveFrame>,
    next_id: u64,
}

impl WgpuBackend {
    /// Creates the device and configures `target` for presentation.
    pub fn connect<T>(target: &T, size: FramebufferSize) -> Result<Self, ContextError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, size)?;
        let screen_depth = DepthBuffer::new(&context.device, context.size());
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("composer sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Ok(Self {
            context: Some(context),
            screen_depth: Some(screen_depth),
            sampler: Some(sampler),
            geometries: HashMap::new(),
            programs: HashMap::new(),
            targets: HashMap::new(),
            frame: None,
            next_id: 1,
        })
    }

    fn mint(&mut self) -> ResourceId {
        let id = ResourceId::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn context(&self) -> Result<&GpuContext, RenderError> {
        self.context.as_ref().ok_or(RenderError::Disposed)
    }

    /// Creates GPU objects inside a validation scope so shader or pipeline
    /// errors surface as [`RenderError::Resource`] instead of a panic.
    fn validated<T>(
        &self,
        label: &str,
        build: impl FnOnce(&GpuContext) -> T,
    ) -> Result<T, RenderError> {
        let context = self.context()?;
        context.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = build(context);
        match pollster::block_on(context.device.pop_error_scope()) {
            Some(err) => Err(RenderError::Resource(format!("{label}: {err}"))),
            None => Ok(value),
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn resize_surface(&mut self, size: FramebufferSize) {
        let Some(context) = self.context.as_mut() else {
            return;
        };
        let applied = context.resize(size);
        if let Some(depth) = self.screen_depth.take() {
            depth.destroy();
        }
        self.screen_depth = Some(DepthBuffer::new(&context.device, applied));
    }

    fn create_geometry(&mut self, geometry: &TorusGeometry) -> Result<GeometryId, RenderError> {
        let buffers = self.validated("torus geometry", |context| {
            let vertex_buffer =
                context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("torus vertices"),
                        contents: bytemuck::cast_slice(geometry.vertices()),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
            let index_buffer =
                context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("torus indices"),
                        contents: bytemuck::cast_slice(geometry.indices()),
                        usage: wgpu::BufferUsages::INDEX,
                    });
            GpuGeometry {
                vertex_buffer,
                index_buffer,
                index_count: geometry.indices().len() as u32,
            }
        })?;
        let id = self.mint();
        self.geometries.insert(id, buffers);
        Ok(GeometryId::new(id))
    }

    fn create_program(&mut self, program: &ShaderProgram) -> Result<ProgramId, RenderError> {
        let resources = self.validated(program.label, |context| {
            ProgramResources::new(&context.device, context.surface_format, program)
        })?;
        let id = self.mint();
        self.programs.insert(id, resources);
        tracing::debug!(label = program.label, id = id.raw(), "compiled program");
        Ok(ProgramId::new(id))
    }

    fn create_target(&mut self, size: FramebufferSize) -> Result<TargetId, RenderError> {
        let target = self.validated("composer target", |context| {
            ColorTarget::new(&context.device, context.surface_format, context.clamp(size))
        })?;
        let id = self.mint();
        self.targets.insert(id, target);
        Ok(TargetId::new(id))
    }

    fn resize_target(
        &mut self,
        target: TargetId,
        size: FramebufferSize,
    ) -> Result<(), RenderError> {
        let id = target.id();
        if !self.targets.contains_key(&id) {
            return Err(RenderError::UnknownResource(id));
        }
        let replacement = self.validated("composer target", |context| {
            ColorTarget::new(&context.device, context.surface_format, context.clamp(size))
        })?;
        if let Some(previous) = self.targets.insert(id, replacement) {
            previous.destroy();
        }
        Ok(())
    }

    fn release(&mut self, resource: ResourceId) {
        if let Some(geometry) = self.geometries.remove(&resource) {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
        } else if let Some(program) = self.programs.remove(&resource) {
            program.uniform_buffer.destroy();
        } else if let Some(target) = self.targets.remove(&resource) {
            target.destroy();
        } else {
            tracing::warn!(id = resource.raw(), "release of unknown GPU resource");
        }
    }

    fn begin_frame(&mut self) -> Result<bool, RenderError> {
        let context = self.context()?;
        let surface_texture = match context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                context.reconfigure();
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface acquire timed out; skipping frame");
                return Ok(false);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(other) => {
                tracing::warn!(error = ?other, "surface acquire failed; skipping frame");
                return Ok(false);
            }
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.frame = Some(ActiveFrame {
            surface_texture,
            view,
            encoder,
        });
        Ok(true)
    }

    fn draw_mesh(&mut self, draw: &MeshDraw<'_>, output: PassOutput) -> Result<(), RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::Disposed)?;
        let frame = self.frame.as_mut().ok_or(RenderError::NoActiveFrame)?;
        let program = self
            .programs
            .get(&draw.program.id())
            .ok_or(RenderError::UnknownResource(draw.program.id()))?;
        let geometry = self
            .geometries
            .get(&draw.geometry.id())
            .ok_or(RenderError::UnknownResource(draw.geometry.id()))?;
        let (color, depth) = match output {
            PassOutput::Target(target) => {
                let target = self
                    .targets
                    .get(&target.id())
                    .ok_or(RenderError::UnknownResource(target.id()))?;
                (&target.view, &target.depth.view)
            }
            PassOutput::Screen => {
                let depth = self.screen_depth.as_ref().ok_or(RenderError::Disposed)?;
                (&frame.view, &depth.view)
            }
        };

        context
            .queue
            .write_buffer(&program.uniform_buffer, 0, draw.uniforms);

        let mut pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &program.uniform_bind_group, &[]);
        pass.set_vertex_buffer(0, geometry.vertex_buffer.slice(..));
        pass.set_index_buffer(geometry.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..geometry.index_count, 0, 0..1);
        Ok(())
    }

    fn draw_fullscreen(
        &mut self,
        draw: &FullscreenDraw<'_>,
        output: PassOutput,
    ) -> Result<(), RenderError> {
        let context = self.context.as_ref().ok_or(RenderError::Disposed)?;
        let sampler = self.sampler.as_ref().ok_or(RenderError::Disposed)?;
        let frame = self.frame.as_mut().ok_or(RenderError::NoActiveFrame)?;
        let program = self
            .programs
            .get(&draw.program.id())
            .ok_or(RenderError::UnknownResource(draw.program.id()))?;
        let layout = match (program.kind, program.input_layout.as_ref()) {
            (ProgramKind::Fullscreen, Some(layout)) => layout,
            _ => {
                return Err(RenderError::Resource(format!(
                    "program {} cannot sample an input",
                    draw.program.id().raw()
                )))
            }
        };
        let input = self
            .targets
            .get(&draw.input.id())
            .ok_or(RenderError::UnknownResource(draw.input.id()))?;
        let color = match output {
            PassOutput::Target(target) => {
                &self
                    .targets
                    .get(&target.id())
                    .ok_or(RenderError::UnknownResource(target.id()))?
                    .view
            }
            PassOutput::Screen => &frame.view,
        };

        context
            .queue
            .write_buffer(&program.uniform_buffer, 0, draw.uniforms);
        let input_group = input_bind_group(&context.device, layout, &input.view, sampler);

        let mut pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fullscreen pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &program.uniform_bind_group, &[]);
        pass.set_bind_group(1, &input_group, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    fn end_frame(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        let Some(context) = self.context.as_ref() else {
            return;
        };
        context.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    fn release_context(&mut self) {
        self.frame = None;
        for (_, geometry) in self.geometries.drain() {
            geometry.vertex_buffer.destroy();
            geometry.index_buffer.destroy();
        }
        for (_, program) in self.programs.drain() {
            program.uniform_buffer.destroy();
        }
        for (_, target) in self.targets.drain() {
            target.destroy();
        }
        if let Some(depth) = self.screen_depth.take() {
            depth.destroy();
        }
        self.sampler = None;
        if let Some(context) = self.context.take() {
            context.device.destroy();
            tracing::debug!("released GPU context");
        }
    }
}
