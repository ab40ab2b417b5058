use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use noiseconfig::NoiseSettings;

/// CPU mirror of the `MeshParams` std140 block in the torus shaders.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshUniforms {
    pub model: [[f32; 4]; 4],
    pub view_projection: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
    pub diffuse: [f32; 4],
    pub u_time: f32,
    pub opacity: f32,
    pub u_noise_frequency: f32,
    pub u_noise_intensity: f32,
    pub u_fresnel_power: f32,
    pub u_glow_intensity: f32,
    pub u_glow_speed: f32,
    pub padding0: f32,
}

impl MeshUniforms {
    pub fn set_matrices(&mut self, model: Mat4, view_projection: Mat4) {
        self.model = model.to_cols_array_2d();
        self.view_projection = view_projection.to_cols_array_2d();
    }

    pub fn set_camera_position(&mut self, position: Vec3) {
        self.camera_position = position.extend(1.0).to_array();
    }
}

/// CPU mirror of the `NoiseParams` std140 block in the noise pass.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct NoiseUniforms {
    pub u_time: f32,
    pub u_noise_intensity: f32,
    pub u_noise_scale: f32,
    pub u_noise_speed: f32,
    pub u_distortion_amount: f32,
    pub padding: [f32; 3],
}

impl NoiseUniforms {
    pub fn new(settings: &NoiseSettings) -> Self {
        let mut uniforms = Self::zeroed();
        uniforms.apply(settings);
        uniforms
    }

    /// Copies every noise field; time is left untouched.
    pub fn apply(&mut self, settings: &NoiseSettings) {
        self.u_noise_intensity = settings.intensity;
        self.u_noise_scale = settings.scale;
        self.u_noise_speed = settings.speed;
        self.u_distortion_amount = settings.distortion;
    }

    pub fn settings(&self) -> NoiseSettings {
        NoiseSettings::new(
            self.u_noise_intensity,
            self.u_noise_scale,
            self.u_noise_speed,
            self.u_distortion_amount,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_match_std140_sizes() {
        assert_eq!(std::mem::size_of::<MeshUniforms>(), 192);
        assert_eq!(std::mem::size_of::<NoiseUniforms>(), 32);
    }

    #[test]
    fn noise_block_mirrors_settings() {
        let settings = NoiseSettings::new(0.5, 80.0, 1.25, 0.3);
        let mut uniforms = NoiseUniforms::new(&settings);
        uniforms.u_time = 4.0;
        assert_eq!(uniforms.settings(), settings);
        uniforms.apply(&NoiseSettings::DEFAULT);
        assert_eq!(uniforms.u_time, 4.0);
        assert_eq!(uniforms.settings(), NoiseSettings::DEFAULT);
    }

    #[test]
    fn camera_position_is_padded_to_vec4() {
        let mut uniforms = MeshUniforms::zeroed();
        uniforms.set_camera_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(uniforms.camera_position, [1.0, 2.0, 3.0, 1.0]);
    }
}
