use crate::types::FramebufferSize;

use super::context::DEPTH_FORMAT;

pub(crate) struct DepthBuffer {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl DepthBuffer {
    pub fn new(device: &wgpu::Device, size: FramebufferSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth buffer"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }

    pub fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Offscreen color buffer that one pass renders into and the next samples.
pub(crate) struct ColorTarget {
    texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth: DepthBuffer,
    pub size: FramebufferSize,
}

impl ColorTarget {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, size: FramebufferSize) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("composer target"),
            size: extent(size),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            depth: DepthBuffer::new(device, size),
            size,
        }
    }

    pub fn destroy(&self) {
        self.texture.destroy();
        self.depth.destroy();
    }
}

fn extent(size: FramebufferSize) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    }
}
