use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::compile::ShaderProgram;
use crate::error::RenderError;
use crate::gpu::{GeometryId, MeshUniforms, ProgramId, RenderBackend};

/// Angular frequency of the torus sway in radians per second.
pub const ROTATION_FREQUENCY: f64 = 0.037;
/// Peak sway angle in radians.
pub const ROTATION_AMPLITUDE: f64 = 3.3;

/// Rotation about the vertical axis at `elapsed` seconds.
///
/// Evaluated in `f64` so long sessions keep sub-milliradian precision.
pub fn rotation_at(elapsed: f32) -> f32 {
    (-(elapsed as f64 * ROTATION_FREQUENCY).sin() * ROTATION_AMPLITUDE) as f32
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusParams {
    /// Distance from the torus center to the center of the tube.
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl Default for TorusParams {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.4,
            radial_segments: 64,
            tubular_segments: 128,
        }
    }
}

/// Torus vertex and index data, lying in the XY plane around the origin.
///
/// Vertices form a `(radial + 1) x (tubular + 1)` grid so the seams carry
/// their own UVs.
#[derive(Debug, Clone)]
pub struct TorusGeometry {
    params: TorusParams,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
}

impl TorusGeometry {
    pub fn new(params: TorusParams) -> Self {
        let radial = params.radial_segments.max(2);
        let tubular = params.tubular_segments.max(3);
        let params = TorusParams {
            radial_segments: radial,
            tubular_segments: tubular,
            ..params
        };

        let mut vertices = Vec::with_capacity(((radial + 1) * (tubular + 1)) as usize);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let ring = params.radius + params.tube * v.cos();
                let position = Vec3::new(ring * u.cos(), ring * u.sin(), params.tube * v.sin());
                let center = Vec3::new(params.radius * u.cos(), params.radius * u.sin(), 0.0);
                let normal = (position - center).normalize_or_zero();
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
                });
            }
        }

        let row = tubular + 1;
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            params,
            vertices,
            indices,
        }
    }

    pub fn params(&self) -> &TorusParams {
        &self.params
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

/// Per-frame and fixed shading inputs of the torus material.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialUniforms {
    pub time: f32,
    pub diffuse: Vec3,
    pub opacity: f32,
    pub camera_position: Vec3,
    pub noise_frequency: f32,
    pub noise_intensity: f32,
    pub fresnel_power: f32,
    pub glow_intensity: f32,
    pub glow_speed: f32,
}

impl Default for MaterialUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            diffuse: Vec3::new(0.25, 0.55, 1.0),
            opacity: 1.0,
            camera_position: crate::camera::DEFAULT_POSITION,
            noise_frequency: 1.5,
            noise_intensity: 0.25,
            fresnel_power: 2.0,
            glow_intensity: 1.2,
            glow_speed: 0.8,
        }
    }
}

/// The torus: immutable geometry, its material, and a time-driven rotation.
#[derive(Debug)]
pub struct Mesh {
    geometry: TorusGeometry,
    geometry_id: Option<GeometryId>,
    program_id: Option<ProgramId>,
    uniforms: MaterialUniforms,
    rotation_y: f32,
}

impl Mesh {
    /// Uploads the geometry and compiles the material program. Nothing is
    /// left allocated when either step fails.
    pub fn create<B: RenderBackend>(
        backend: &mut B,
        params: TorusParams,
        program: &ShaderProgram,
        uniforms: MaterialUniforms,
    ) -> Result<Self, RenderError> {
        let geometry = TorusGeometry::new(params);
        let geometry_id = backend.create_geometry(&geometry)?;
        let program_id = match backend.create_program(program) {
            Ok(id) => id,
            Err(err) => {
                backend.release(geometry_id.into());
                return Err(err);
            }
        };
        tracing::debug!(
            vertices = geometry.vertices().len(),
            indices = geometry.indices().len(),
            "created torus mesh"
        );
        Ok(Self {
            geometry,
            geometry_id: Some(geometry_id),
            program_id: Some(program_id),
            uniforms,
            rotation_y: 0.0,
        })
    }

    /// Applies the time-driven state for a frame at `elapsed` seconds.
    pub fn advance(&mut self, elapsed: f32, camera_position: Vec3) {
        self.uniforms.time = elapsed;
        self.uniforms.camera_position = camera_position;
        self.rotation_y = rotation_at(elapsed);
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn uniforms(&self) -> &MaterialUniforms {
        &self.uniforms
    }

    pub fn geometry(&self) -> &TorusGeometry {
        &self.geometry
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation_y)
    }

    /// Packs the material for a draw seen through `view_projection`.
    pub fn gpu_uniforms(&self, view_projection: Mat4) -> MeshUniforms {
        let uniforms = &self.uniforms;
        let mut block = MeshUniforms::zeroed();
        block.set_matrices(self.model_matrix(), view_projection);
        block.set_camera_position(uniforms.camera_position);
        block.diffuse = uniforms.diffuse.extend(1.0).to_array();
        block.u_time = uniforms.time;
        block.opacity = uniforms.opacity;
        block.u_noise_frequency = uniforms.noise_frequency;
        block.u_noise_intensity = uniforms.noise_intensity;
        block.u_fresnel_power = uniforms.fresnel_power;
        block.u_glow_intensity = uniforms.glow_intensity;
        block.u_glow_speed = uniforms.glow_speed;
        block
    }

    pub(crate) fn draw_handles(&self) -> Option<(ProgramId, GeometryId)> {
        Some((self.program_id?, self.geometry_id?))
    }

    pub fn is_disposed(&self) -> bool {
        self.geometry_id.is_none() && self.program_id.is_none()
    }

    /// Releases geometry and program. Safe to call more than once.
    pub fn dispose<B: RenderBackend>(&mut self, backend: &mut B) {
        if let Some(id) = self.geometry_id.take() {
            backend.release(id.into());
        }
        if let Some(id) = self.program_id.take() {
            backend.release(id.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{RecordingBackend, ResourceKind};

    #[test]
    fn rotation_follows_sine_sway() {
        assert_eq!(rotation_at(0.0), 0.0);
        assert!((rotation_at(1.0) - -0.122_07).abs() < 1e-4);
        let quarter = (std::f64::consts::FRAC_PI_2 / ROTATION_FREQUENCY) as f32;
        assert!((rotation_at(quarter) + 3.3).abs() < 1e-4);
    }

    #[test]
    fn rotation_stays_precise_for_long_sessions() {
        let elapsed = 86_400.0_f32;
        let expected = -(elapsed as f64 * ROTATION_FREQUENCY).sin() * ROTATION_AMPLITUDE;
        assert!((rotation_at(elapsed) as f64 - expected).abs() < 1e-6);
    }

    #[test]
    fn torus_grid_has_expected_counts() {
        let params = TorusParams {
            radius: 1.0,
            tube: 0.4,
            radial_segments: 8,
            tubular_segments: 16,
        };
        let geometry = TorusGeometry::new(params);
        assert_eq!(geometry.vertices().len(), 9 * 17);
        assert_eq!(geometry.indices().len(), 8 * 16 * 6);
        let max_index = *geometry.indices().iter().max().unwrap();
        assert!((max_index as usize) < geometry.vertices().len());
    }

    #[test]
    fn torus_vertices_sit_on_the_tube() {
        let geometry = TorusGeometry::new(TorusParams::default());
        for vertex in geometry.vertices().iter().step_by(97) {
            let position = Vec3::from_array(vertex.position);
            let ring = Vec3::new(position.x, position.y, 0.0).normalize() * 1.0;
            assert!(((position - ring).length() - 0.4).abs() < 1e-4);
            assert!((Vec3::from_array(vertex.normal).length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn advance_copies_time_and_camera_position() {
        let (mut backend, _ledger) = RecordingBackend::new();
        let mut mesh = Mesh::create(
            &mut backend,
            TorusParams::default(),
            &ShaderProgram::torus(),
            MaterialUniforms::default(),
        )
        .unwrap();
        let mut camera = Vec3::new(0.0, 1.0, 4.0);
        mesh.advance(1.0, camera);
        camera.x = 9.0;
        assert_eq!(mesh.uniforms().time, 1.0);
        assert_eq!(mesh.uniforms().camera_position, Vec3::new(0.0, 1.0, 4.0));
        assert!((mesh.rotation_y() - rotation_at(1.0)).abs() < f32::EPSILON);

        let block = mesh.gpu_uniforms(Mat4::IDENTITY);
        assert_eq!(block.u_time, 1.0);
        assert_eq!(block.camera_position, [0.0, 1.0, 4.0, 1.0]);
        assert_eq!(block.model, Mat4::from_rotation_y(mesh.rotation_y()).to_cols_array_2d());
    }

    #[test]
    fn frames_never_touch_the_geometry() {
        let (mut backend, _ledger) = RecordingBackend::new();
        let mut mesh = Mesh::create(
            &mut backend,
            TorusParams::default(),
            &ShaderProgram::torus(),
            MaterialUniforms::default(),
        )
        .unwrap();
        let vertices = mesh.geometry().vertices().to_vec();
        let indices = mesh.geometry().indices().to_vec();
        for step in 0..120 {
            mesh.advance(step as f32 / 60.0, Vec3::new(0.0, 0.0, 5.0));
        }
        assert_eq!(mesh.geometry().params(), &TorusParams::default());
        assert_eq!(mesh.geometry().vertices(), vertices.as_slice());
        assert_eq!(mesh.geometry().indices(), indices.as_slice());
    }

    #[test]
    fn dispose_releases_each_handle_once() {
        let (mut backend, ledger) = RecordingBackend::new();
        let mut mesh = Mesh::create(
            &mut backend,
            TorusParams::default(),
            &ShaderProgram::torus(),
            MaterialUniforms::default(),
        )
        .unwrap();
        mesh.dispose(&mut backend);
        mesh.dispose(&mut backend);
        let ledger = ledger.borrow();
        assert!(mesh.is_disposed());
        assert_eq!(ledger.released.len(), 2);
        assert_eq!(ledger.invalid_releases, 0);
        assert!(ledger.live.is_empty());
    }

    #[test]
    fn failed_program_releases_geometry() {
        let (mut backend, ledger) = RecordingBackend::new();
        ledger.borrow_mut().fail_program = Some("torus surface");
        let result = Mesh::create(
            &mut backend,
            TorusParams::default(),
            &ShaderProgram::torus(),
            MaterialUniforms::default(),
        );
        assert!(matches!(result, Err(RenderError::Resource(_))));
        let ledger = ledger.borrow();
        assert_eq!(ledger.live_count(ResourceKind::Geometry), 0);
        assert_eq!(ledger.released.len(), 1);
    }
}
