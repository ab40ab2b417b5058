use std::time::Instant;

use noiseconfig::{NoiseField, NoiseSettings};

use crate::camera::CameraSet;
use crate::compile::ShaderProgram;
use crate::composer::{Composer, NoisePass, Pass, RenderPass};
use crate::controls::{OrbitControls, PointerEvent};
use crate::error::{ContextError, RenderError};
use crate::gpu::RenderBackend;
use crate::mesh::{MaterialUniforms, Mesh, TorusParams};
use crate::noise::NoiseControls;
use crate::runtime::{BoxedTimeSource, FrameStats, RefreshSignal};
use crate::surface::RenderSurface;
use crate::types::{CameraKind, FramebufferSize, SurfaceSize};

/// Everything needed to assemble the scene, apart from the surface itself.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub camera: CameraKind,
    pub noise: NoiseSettings,
    pub torus: TorusParams,
    pub material: MaterialUniforms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Running,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// Not running, or the surface had no image to draw into.
    Skipped,
}

/// Owns the whole pipeline and advances it once per display refresh.
///
/// A tick reads the clock, advances the mesh, updates the composer's time,
/// applies damped camera motion, renders every pass, and arms the next
/// refresh, in that order. Once disposed every entry point is a no-op.
pub struct FrameDriver<B: RenderBackend, R: RefreshSignal> {
    state: DriverState,
    surface: RenderSurface<B>,
    cameras: CameraSet,
    mesh: Mesh,
    controls: OrbitControls,
    composer: Composer,
    noise: NoiseControls,
    clock: BoxedTimeSource,
    refresh: R,
    stats: FrameStats,
    #[cfg(test)]
    teardown_log: Vec<Teardown>,
}

impl<B: RenderBackend, R: RefreshSignal> FrameDriver<B, R> {
    /// Builds the scene on `surface`. On failure every resource created so
    /// far is released and the surface is destroyed.
    pub fn new(
        mut surface: RenderSurface<B>,
        options: PipelineOptions,
        clock: BoxedTimeSource,
        refresh: R,
    ) -> Result<Self, ContextError> {
        let size = surface.size();
        let noise = NoiseControls::new(options.noise);
        let Some(backend) = surface.backend_mut() else {
            return Err(ContextError::SurfaceUnavailable(
                "surface was destroyed before the pipeline was built".to_string(),
            ));
        };

        let mut mesh = Mesh::create(
            backend,
            options.torus,
            &ShaderProgram::torus(),
            options.material,
        )?;
        let composer = match build_composer(
            backend,
            size.framebuffer(),
            options.camera,
            &noise.settings(),
        ) {
            Ok(composer) => composer,
            Err(err) => {
                mesh.dispose(backend);
                return Err(err.into());
            }
        };

        tracing::info!(
            width = size.width,
            height = size.height,
            pixel_ratio = size.pixel_ratio,
            camera = %options.camera,
            "pipeline ready"
        );

        Ok(Self {
            state: DriverState::Uninitialized,
            surface,
            cameras: CameraSet::new(size.aspect(), options.camera),
            mesh,
            controls: OrbitControls::new(options.camera, size.height as f32),
            composer,
            noise,
            clock,
            refresh,
            stats: FrameStats::new(Instant::now()),
            #[cfg(test)]
            teardown_log: Vec::new(),
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_disposed(&self) -> bool {
        self.state == DriverState::Disposed
    }

    /// Arms the first refresh. Returns false unless the driver was waiting
    /// to start.
    pub fn start(&mut self) -> bool {
        if self.state != DriverState::Uninitialized {
            return false;
        }
        self.state = DriverState::Running;
        self.refresh.schedule();
        true
    }

    pub fn tick(&mut self) -> Result<TickOutcome, RenderError> {
        if self.state != DriverState::Running {
            return Ok(TickOutcome::Skipped);
        }

        self.refresh.fired();
        let sample = self.clock.sample();
        let camera_position = self.cameras.active().position();
        self.mesh.advance(sample.seconds, camera_position);
        self.composer.set_time(sample.seconds);
        self.controls.update(&mut self.cameras);

        let backend = self.surface.backend_mut().ok_or(RenderError::Disposed)?;
        let presented = self.composer.render(backend, &self.mesh, &self.cameras)?;
        self.refresh.schedule();

        if !presented {
            return Ok(TickOutcome::Skipped);
        }
        if let Some(fps) = self.stats.record(Instant::now()) {
            tracing::debug!(
                fps = format_args!("{fps:.1}"),
                frame = sample.frame_index,
                "frame rate"
            );
        }
        Ok(TickOutcome::Rendered)
    }

    /// Applies a new logical size and pixel ratio. Zero sizes are ignored.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) -> bool {
        if self.ignores("resize") {
            return false;
        }
        let size = SurfaceSize::new(width, height, pixel_ratio);
        if !self.surface.resize(size) {
            return false;
        }
        self.cameras.on_resize(size.aspect());
        self.controls.set_viewport_height(height as f32);
        if let Some(backend) = self.surface.backend_mut() {
            if let Err(err) = self.composer.set_size(backend, size.framebuffer()) {
                tracing::warn!(error = %err, "failed to resize composer targets");
            }
        }
        tracing::debug!(width, height, pixel_ratio = size.pixel_ratio, "resized");
        true
    }

    pub fn update_noise_settings(&mut self, settings: NoiseSettings) -> Option<NoiseSettings> {
        if self.ignores("update noise settings") {
            return None;
        }
        Some(self.noise.on_change(settings, &mut self.composer))
    }

    pub fn set_noise_field(&mut self, field: NoiseField, value: f32) -> Option<NoiseSettings> {
        if self.ignores("set noise field") {
            return None;
        }
        Some(self.noise.set_field(field, value, &mut self.composer))
    }

    pub fn reset_noise_settings(&mut self) -> Option<NoiseSettings> {
        if self.ignores("reset noise settings") {
            return None;
        }
        Some(self.noise.reset(&mut self.composer))
    }

    /// Registers a callback for every noise settings replacement.
    pub fn on_settings_change(&mut self, listener: impl FnMut(&NoiseSettings) + 'static) {
        self.noise.subscribe(listener);
    }

    /// Switches cameras. The controls and the scene pass move over in the
    /// same call, so the next frame never sees them disagree.
    pub fn set_active_camera(&mut self, kind: CameraKind) -> bool {
        if self.ignores("camera switch") {
            return false;
        }
        let changed = self.cameras.set_active(kind);
        self.controls.rebind(kind);
        self.composer.set_camera(kind);
        if changed {
            tracing::info!(camera = %kind, "switched camera");
        }
        changed
    }

    pub fn toggle_camera(&mut self) -> CameraKind {
        let next = self.cameras.active_kind().toggled();
        self.set_active_camera(next);
        self.cameras.active_kind()
    }

    pub fn handle_pointer(&mut self, event: PointerEvent) {
        if self.ignores("pointer input") {
            return;
        }
        self.controls.handle(event);
    }

    /// True once disposed; late events are dropped here.
    fn ignores(&self, event: &'static str) -> bool {
        if self.is_disposed() {
            tracing::trace!(event, "ignoring event after disposal");
            return true;
        }
        false
    }

    pub fn cameras(&self) -> &CameraSet {
        &self.cameras
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn noise_settings(&self) -> NoiseSettings {
        self.noise.settings()
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.surface.size()
    }

    pub fn refresh(&self) -> &R {
        &self.refresh
    }

    /// Cancels the refresh, then tears down the mesh, controls, composer,
    /// and surface in that order. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.state == DriverState::Disposed {
            return;
        }
        self.state = DriverState::Disposed;
        self.refresh.cancel();
        for stage in TEARDOWN_ORDER {
            self.tear_down(stage);
        }
        tracing::debug!("pipeline disposed");
    }

    fn tear_down(&mut self, stage: Teardown) {
        #[cfg(test)]
        self.teardown_log.push(stage);
        match stage {
            Teardown::Mesh => {
                if let Some(backend) = self.surface.backend_mut() {
                    self.mesh.dispose(backend);
                }
            }
            Teardown::Controls => self.controls.dispose(),
            Teardown::Composer => {
                if let Some(backend) = self.surface.backend_mut() {
                    self.composer.dispose(backend);
                }
            }
            Teardown::Surface => self.surface.destroy(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Mesh,
    Controls,
    Composer,
    Surface,
}

const TEARDOWN_ORDER: [Teardown; 4] = [
    Teardown::Mesh,
    Teardown::Controls,
    Teardown::Composer,
    Teardown::Surface,
];

impl<B: RenderBackend, R: RefreshSignal> Drop for FrameDriver<B, R> {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn build_composer<B: RenderBackend>(
    backend: &mut B,
    size: FramebufferSize,
    camera: CameraKind,
    settings: &NoiseSettings,
) -> Result<Composer, RenderError> {
    let mut composer = Composer::new(backend, size)?;
    composer.add_pass(Pass::Render(RenderPass::new(camera)));
    match NoisePass::create(backend, settings) {
        Ok(noise) => composer.add_pass(Pass::Noise(noise)),
        Err(err) => {
            composer.dispose(backend);
            return Err(err);
        }
    }
    Ok(composer)
}
