//! Ordered post-processing chain.
//!
//! The first pass draws the scene, every later pass samples the color
//! buffer of the one before it, and the last pass writes to the screen.
//! Intermediate output alternates between two targets sized to the
//! framebuffer:
//!
//! ```text
//!   scene ──► [target A] ──► noise ──► [target B] ──► … ──► screen
//! ```

use noiseconfig::NoiseSettings;

use crate::camera::CameraSet;
use crate::compile::ShaderProgram;
use crate::error::RenderError;
use crate::gpu::{
    FullscreenDraw, MeshDraw, NoiseUniforms, PassOutput, ProgramId, RenderBackend, TargetId,
};
use crate::mesh::Mesh;
use crate::noise::NoiseUniformSink;
use crate::types::{CameraKind, FramebufferSize};

/// Draws the scene through one of the cameras.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    camera: CameraKind,
    renders_to_screen: bool,
}

impl RenderPass {
    pub fn new(camera: CameraKind) -> Self {
        Self {
            camera,
            renders_to_screen: false,
        }
    }

    pub fn camera(&self) -> CameraKind {
        self.camera
    }
}

/// Film grain and UV distortion over the previous pass's output.
#[derive(Debug, Clone, PartialEq)]
pub struct NoisePass {
    program: Option<ProgramId>,
    uniforms: NoiseUniforms,
    renders_to_screen: bool,
}

impl NoisePass {
    pub fn create<B: RenderBackend>(
        backend: &mut B,
        settings: &NoiseSettings,
    ) -> Result<Self, RenderError> {
        let program = backend.create_program(&ShaderProgram::noise())?;
        Ok(Self {
            program: Some(program),
            uniforms: NoiseUniforms::new(settings),
            renders_to_screen: false,
        })
    }

    pub fn uniforms(&self) -> &NoiseUniforms {
        &self.uniforms
    }

    pub fn settings(&self) -> NoiseSettings {
        self.uniforms.settings()
    }

    fn release<B: RenderBackend>(&mut self, backend: &mut B) {
        if let Some(program) = self.program.take() {
            backend.release(program.into());
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pass {
    Render(RenderPass),
    Noise(NoisePass),
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::Render(_) => "render",
            Pass::Noise(_) => "noise",
        }
    }

    /// Whether the pass samples the previous pass's color buffer.
    pub fn consumes_input(&self) -> bool {
        matches!(self, Pass::Noise(_))
    }

    pub fn renders_to_screen(&self) -> bool {
        match self {
            Pass::Render(pass) => pass.renders_to_screen,
            Pass::Noise(pass) => pass.renders_to_screen,
        }
    }

    fn set_renders_to_screen(&mut self, value: bool) {
        match self {
            Pass::Render(pass) => pass.renders_to_screen = value,
            Pass::Noise(pass) => pass.renders_to_screen = value,
        }
    }
}

pub struct Composer {
    passes: Vec<Pass>,
    targets: Option<[TargetId; 2]>,
    size: FramebufferSize,
}

impl Composer {
    /// Allocates both intermediate targets at `size`.
    pub fn new<B: RenderBackend>(
        backend: &mut B,
        size: FramebufferSize,
    ) -> Result<Self, RenderError> {
        let first = backend.create_target(size)?;
        let second = match backend.create_target(size) {
            Ok(target) => target,
            Err(err) => {
                backend.release(first.into());
                return Err(err);
            }
        };
        Ok(Self {
            passes: Vec::new(),
            targets: Some([first, second]),
            size,
        })
    }

    /// Appends `pass`; it becomes the only pass writing to the screen.
    pub fn add_pass(&mut self, mut pass: Pass) {
        if let Some(previous) = self.passes.last_mut() {
            previous.set_renders_to_screen(false);
        }
        pass.set_renders_to_screen(true);
        self.passes.push(pass);
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn size(&self) -> FramebufferSize {
        self.size
    }

    /// Camera used by the base scene pass.
    pub fn base_camera(&self) -> Option<CameraKind> {
        match self.passes.first() {
            Some(Pass::Render(pass)) => Some(pass.camera),
            _ => None,
        }
    }

    /// Repoints the base scene pass at another camera.
    pub fn set_camera(&mut self, camera: CameraKind) {
        if let Some(Pass::Render(pass)) = self.passes.first_mut() {
            pass.camera = camera;
        }
    }

    /// Resizes both intermediate targets to the new framebuffer size.
    ///
    /// Either both targets take the new size or neither does: when the second
    /// resize fails the first target is put back at the previous size.
    pub fn set_size<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        size: FramebufferSize,
    ) -> Result<(), RenderError> {
        let Some([first, second]) = self.targets else {
            return Err(RenderError::Disposed);
        };
        backend.resize_target(first, size)?;
        if let Err(err) = backend.resize_target(second, size) {
            if let Err(restore) = backend.resize_target(first, self.size) {
                tracing::warn!(error = %restore, "failed to restore composer target size");
            }
            return Err(err);
        }
        self.size = size;
        Ok(())
    }

    pub fn set_time(&mut self, seconds: f32) {
        for pass in &mut self.passes {
            if let Pass::Noise(noise) = pass {
                noise.uniforms.u_time = seconds;
            }
        }
    }

    /// Settings held by the noise pass nearest to the screen.
    pub fn noise_settings(&self) -> Option<NoiseSettings> {
        self.passes.iter().rev().find_map(|pass| match pass {
            Pass::Noise(noise) => Some(noise.settings()),
            _ => None,
        })
    }

    fn validate(&self) -> Result<(), RenderError> {
        if self.targets.is_none() {
            return Err(RenderError::Disposed);
        }
        match self.passes.first() {
            None => Err(RenderError::EmptyComposer),
            Some(pass) if pass.consumes_input() => Err(RenderError::MissingInput { index: 0 }),
            Some(_) => Ok(()),
        }
    }

    /// Runs every pass in order. Returns `Ok(false)` when the backend skipped
    /// the frame.
    pub fn render<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        mesh: &Mesh,
        cameras: &CameraSet,
    ) -> Result<bool, RenderError> {
        self.validate()?;
        if !backend.begin_frame()? {
            return Ok(false);
        }
        let result = self.encode(backend, mesh, cameras);
        backend.end_frame();
        result.map(|()| true)
    }

    fn encode<B: RenderBackend>(
        &self,
        backend: &mut B,
        mesh: &Mesh,
        cameras: &CameraSet,
    ) -> Result<(), RenderError> {
        let targets = self.targets.ok_or(RenderError::Disposed)?;
        let mut previous: Option<TargetId> = None;
        for (index, pass) in self.passes.iter().enumerate() {
            let output = if pass.renders_to_screen() {
                PassOutput::Screen
            } else {
                PassOutput::Target(targets[index % 2])
            };
            match pass {
                Pass::Render(render) => {
                    let (program, geometry) = mesh.draw_handles().ok_or(RenderError::Disposed)?;
                    let view_projection = cameras.get(render.camera).view_projection();
                    let uniforms = mesh.gpu_uniforms(view_projection);
                    backend.draw_mesh(
                        &MeshDraw {
                            program,
                            geometry,
                            uniforms: bytemuck::bytes_of(&uniforms),
                        },
                        output,
                    )?;
                }
                Pass::Noise(noise) => {
                    let input = previous.ok_or(RenderError::MissingInput { index })?;
                    let program = noise.program.ok_or(RenderError::Disposed)?;
                    backend.draw_fullscreen(
                        &FullscreenDraw {
                            program,
                            input,
                            uniforms: bytemuck::bytes_of(&noise.uniforms),
                        },
                        output,
                    )?;
                }
            }
            previous = match output {
                PassOutput::Target(target) => Some(target),
                PassOutput::Screen => None,
            };
        }
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.targets.is_none()
    }

    /// Releases pass programs and both targets. Safe to call more than once.
    pub fn dispose<B: RenderBackend>(&mut self, backend: &mut B) {
        for pass in &mut self.passes {
            if let Pass::Noise(noise) = pass {
                noise.release(backend);
            }
        }
        if let Some(targets) = self.targets.take() {
            for target in targets {
                backend.release(target.into());
            }
        }
    }
}

impl NoiseUniformSink for Composer {
    fn apply_noise(&mut self, settings: &NoiseSettings) {
        for pass in &mut self.passes {
            if let Pass::Noise(noise) = pass {
                noise.uniforms.apply(settings);
            }
        }
    }
}

impl std::fmt::Debug for Composer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field(
                "passes",
                &self.passes.iter().map(Pass::name).collect::<Vec<_>>(),
            )
            .field("size", &self.size)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::recording::{Command, RecordingBackend, ResourceKind};
    use crate::mesh::{MaterialUniforms, TorusParams};

    fn scene(backend: &mut RecordingBackend) -> (Mesh, CameraSet) {
        let mesh = Mesh::create(
            backend,
            TorusParams::default(),
            &ShaderProgram::torus(),
            MaterialUniforms::default(),
        )
        .unwrap();
        (mesh, CameraSet::new(1.0, CameraKind::Perspective))
    }

    #[test]
    fn last_added_pass_is_the_only_screen_pass() {
        let (mut backend, _ledger) = RecordingBackend::new();
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(64, 64)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        assert!(composer.passes()[0].renders_to_screen());
        let noise = NoisePass::create(&mut backend, &NoiseSettings::DEFAULT).unwrap();
        composer.add_pass(Pass::Noise(noise));
        let flags: Vec<bool> = composer
            .passes()
            .iter()
            .map(Pass::renders_to_screen)
            .collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[test]
    fn passes_pipe_output_into_the_next_input() {
        let (mut backend, ledger) = RecordingBackend::new();
        let (mesh, cameras) = scene(&mut backend);
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(64, 64)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        for _ in 0..2 {
            let noise = NoisePass::create(&mut backend, &NoiseSettings::DEFAULT).unwrap();
            composer.add_pass(Pass::Noise(noise));
        }

        assert!(composer.render(&mut backend, &mesh, &cameras).unwrap());

        let ledger = ledger.borrow();
        let frames = ledger.frames();
        assert_eq!(frames.len(), 1);
        let frame = frames[0];
        assert_eq!(frame.len(), 3);
        let Command::DrawMesh {
            output: PassOutput::Target(scene_target),
            ..
        } = frame[0]
        else {
            panic!("scene pass must draw offscreen: {:?}", frame[0]);
        };
        let Command::DrawFullscreen {
            input: first_input,
            output: PassOutput::Target(middle_target),
            ..
        } = frame[1]
        else {
            panic!("middle pass must draw offscreen: {:?}", frame[1]);
        };
        assert_eq!(first_input, scene_target);
        assert_ne!(middle_target, scene_target);
        let Command::DrawFullscreen {
            input: last_input,
            output: PassOutput::Screen,
            ..
        } = frame[2]
        else {
            panic!("last pass must draw to the screen: {:?}", frame[2]);
        };
        assert_eq!(last_input, middle_target);
    }

    #[test]
    fn empty_composer_refuses_to_render() {
        let (mut backend, ledger) = RecordingBackend::new();
        let (mesh, cameras) = scene(&mut backend);
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        let err = composer.render(&mut backend, &mesh, &cameras).unwrap_err();
        assert!(matches!(err, RenderError::EmptyComposer));
        assert!(ledger.borrow().frames().is_empty());
    }

    #[test]
    fn input_consuming_first_pass_is_rejected() {
        let (mut backend, _ledger) = RecordingBackend::new();
        let (mesh, cameras) = scene(&mut backend);
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        let noise = NoisePass::create(&mut backend, &NoiseSettings::DEFAULT).unwrap();
        composer.add_pass(Pass::Noise(noise));
        let err = composer.render(&mut backend, &mesh, &cameras).unwrap_err();
        assert!(matches!(err, RenderError::MissingInput { index: 0 }));
    }

    #[test]
    fn skipped_frames_draw_nothing() {
        let (mut backend, ledger) = RecordingBackend::new();
        let (mesh, cameras) = scene(&mut backend);
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        ledger.borrow_mut().skip_frames = true;
        assert!(!composer.render(&mut backend, &mesh, &cameras).unwrap());
        assert!(ledger.borrow().commands.is_empty());
    }

    #[test]
    fn set_size_resizes_both_targets() {
        let (mut backend, ledger) = RecordingBackend::new();
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        let size = FramebufferSize::new(1600, 1200);
        composer.set_size(&mut backend, size).unwrap();
        assert_eq!(composer.size(), size);
        let resized = ledger
            .borrow()
            .commands
            .iter()
            .filter(|command| matches!(command, Command::ResizeTarget(_, s) if *s == size))
            .count();
        assert_eq!(resized, 2);
    }

    #[test]
    fn failed_resize_keeps_both_targets_at_the_old_size() {
        let (mut backend, ledger) = RecordingBackend::new();
        let original = FramebufferSize::new(8, 8);
        let mut composer = Composer::new(&mut backend, original).unwrap();
        let [first, second] = composer.targets.unwrap();
        ledger.borrow_mut().fail_resize = Some(second);

        let err = composer
            .set_size(&mut backend, FramebufferSize::new(64, 64))
            .unwrap_err();
        assert!(matches!(err, RenderError::Resource(_)));
        assert_eq!(composer.size(), original);
        assert_eq!(
            ledger.borrow().commands,
            vec![
                Command::ResizeTarget(first, FramebufferSize::new(64, 64)),
                Command::ResizeTarget(first, original),
            ]
        );
    }

    #[test]
    fn set_camera_repoints_the_scene_pass() {
        let (mut backend, ledger) = RecordingBackend::new();
        let (mesh, mut cameras) = scene(&mut backend);
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        composer.set_camera(CameraKind::Orthographic);
        cameras.set_active(CameraKind::Orthographic);
        assert_eq!(composer.base_camera(), Some(CameraKind::Orthographic));

        composer.render(&mut backend, &mesh, &cameras).unwrap();
        let expected = mesh.gpu_uniforms(cameras.get(CameraKind::Orthographic).view_projection());
        let ledger = ledger.borrow();
        let Command::DrawMesh { uniforms, .. } = &ledger.frames()[0][0] else {
            panic!("expected a mesh draw");
        };
        assert_eq!(uniforms.as_slice(), bytemuck::bytes_of(&expected));
    }

    #[test]
    fn noise_sink_updates_pass_uniforms() {
        let (mut backend, _ledger) = RecordingBackend::new();
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        let noise = NoisePass::create(&mut backend, &NoiseSettings::DEFAULT).unwrap();
        composer.add_pass(Pass::Noise(noise));
        let settings = NoiseSettings::new(0.5, 80.0, 1.0, 0.3);
        composer.apply_noise(&settings);
        composer.set_time(2.5);
        assert_eq!(composer.noise_settings(), Some(settings));
        let Pass::Noise(noise) = &composer.passes()[1] else {
            panic!("expected noise pass");
        };
        assert_eq!(noise.uniforms().u_time, 2.5);
    }

    #[test]
    fn dispose_releases_programs_and_targets_once() {
        let (mut backend, ledger) = RecordingBackend::new();
        let mut composer = Composer::new(&mut backend, FramebufferSize::new(8, 8)).unwrap();
        composer.add_pass(Pass::Render(RenderPass::new(CameraKind::Perspective)));
        let noise = NoisePass::create(&mut backend, &NoiseSettings::DEFAULT).unwrap();
        composer.add_pass(Pass::Noise(noise));
        composer.dispose(&mut backend);
        composer.dispose(&mut backend);
        let ledger = ledger.borrow();
        assert!(composer.is_disposed());
        assert_eq!(ledger.live_count(ResourceKind::Target), 0);
        assert_eq!(ledger.live_count(ResourceKind::Program), 0);
        assert_eq!(ledger.invalid_releases, 0);
    }
}
