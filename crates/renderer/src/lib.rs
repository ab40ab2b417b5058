//! Renderer crate for torusglow.
//!
//! Draws a displaced, glowing torus and runs the frame through a small
//! post-processing chain whose noise parameters can be changed while the
//! window is open. The overall flow is:
//!
//! ```text
//!   CLI / panel commands
//!          │ WindowCommand
//!          ▼
//!   WindowRuntime ──▶ winit event loop ──▶ FrameDriver::tick()
//!          ▲                                   │
//!          │ WindowNotification                ├─▶ Mesh::advance()
//!          │                                   ├─▶ OrbitControls::update()
//!          └──────── NoiseControls ◀───────────└─▶ Composer::render() ─▶ surface
//! ```
//!
//! `FrameDriver` owns every scene object and the [`RenderSurface`]. Scene
//! objects only hold typed ids minted by a [`RenderBackend`]; the wgpu
//! implementation lives in [`gpu`], and tests swap in a recording backend so
//! resource lifetimes can be checked without a GPU.

mod camera;
mod compile;
mod composer;
mod controls;
mod driver;
mod error;
pub mod gpu;
mod mesh;
mod noise;
mod runtime;
mod surface;
mod types;
mod window;

pub use camera::{Camera, CameraSet, Projection};
pub use compile::{ProgramKind, ShaderProgram};
pub use composer::{Composer, NoisePass, Pass, RenderPass};
pub use controls::{OrbitControls, PointerEvent};
pub use driver::{DriverState, FrameDriver, PipelineOptions, TickOutcome};
pub use error::{ContextError, RenderError};
pub use gpu::{RenderBackend, WgpuBackend};
pub use mesh::{rotation_at, MaterialUniforms, Mesh, TorusGeometry, TorusParams, Vertex};
pub use noise::{NoiseControls, NoiseUniformSink, SettingsListener};
pub use runtime::{
    BoxedTimeSource, FrameStats, ManualTimeSource, RefreshSignal, SystemTimeSource, TimeSample,
    TimeSource,
};
pub use surface::RenderSurface;
pub use types::{CameraKind, FramebufferSize, RendererConfig, SurfaceSize};
pub use window::{
    key_action, render_scale, wheel_delta, ControlHandle, KeyAction, RedrawRequester,
    WindowCommand, WindowNotification, WindowRuntime,
};

pub use noiseconfig::{NoiseField, NoiseSettings};
