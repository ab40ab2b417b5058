use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use winit::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{error, info, warn};

use noiseconfig::{NoiseField, NoiseSettings};

use crate::controls::PointerEvent;
use crate::driver::{FrameDriver, PipelineOptions};
use crate::error::RenderError;
use crate::gpu::WgpuBackend;
use crate::runtime::{RefreshSignal, SystemTimeSource};
use crate::surface::RenderSurface;
use crate::types::{CameraKind, RendererConfig};

/// Requests sent from other threads into the window's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowCommand {
    UpdateNoise(NoiseSettings),
    SetNoiseField(NoiseField, f32),
    ResetNoise,
    SetCamera(CameraKind),
    ToggleCamera,
    Shutdown,
}

/// State changes reported back by the window thread.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowNotification {
    NoiseChanged(NoiseSettings),
    CameraChanged(CameraKind),
    Closed,
}

/// Cloneable handle for steering a running window from any thread.
#[derive(Clone)]
pub struct ControlHandle {
    proxy: EventLoopProxy<WindowCommand>,
}

impl ControlHandle {
    pub fn send(&self, command: WindowCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|err| anyhow!("window is no longer running: {err}"))
    }
}

pub struct WindowRuntime {
    control: ControlHandle,
    notifications: Receiver<WindowNotification>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window on its own thread and waits until the first frame
    /// is scheduled, or until initialisation fails.
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (notify_tx, notify_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("torusglow-window".into())
            .spawn(move || run_window_thread(config, ready_tx, notify_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            control: ControlHandle { proxy },
            notifications: notify_rx,
            join_handle: Some(handle),
        })
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    pub fn notifications(&self) -> &Receiver<WindowNotification> {
        &self.notifications
    }

    /// Blocks until the window closes on its own.
    pub fn wait(mut self) -> Result<()> {
        match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))?,
            None => Ok(()),
        }
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.control.send(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.control.send(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Refresh signal backed by winit redraw requests.
pub struct RedrawRequester {
    window: Arc<Window>,
    scheduled: bool,
}

impl RedrawRequester {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            scheduled: false,
        }
    }
}

impl RefreshSignal for RedrawRequester {
    fn schedule(&mut self) {
        self.scheduled = true;
        self.window.request_redraw();
    }

    fn cancel(&mut self) {
        self.scheduled = false;
    }

    fn fired(&mut self) {
        self.scheduled = false;
    }

    fn is_scheduled(&self) -> bool {
        self.scheduled
    }
}

/// Ratio between framebuffer pixels and window pixels once the display
/// scale is capped at `max_pixel_ratio`.
pub fn render_scale(scale_factor: f64, max_pixel_ratio: f32) -> f32 {
    if !scale_factor.is_finite() || scale_factor <= 0.0 {
        return 1.0;
    }
    if !max_pixel_ratio.is_finite() || max_pixel_ratio <= 0.0 {
        return 1.0;
    }
    (max_pixel_ratio as f64 / scale_factor).min(1.0) as f32
}

/// Keyboard shortcuts understood by the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    ToggleCamera,
    ResetNoise,
    Close,
}

pub fn key_action(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Close),
        Key::Character(value) => match value.as_str() {
            "c" | "C" => Some(KeyAction::ToggleCamera),
            "r" | "R" => Some(KeyAction::ResetNoise),
            _ => None,
        },
        _ => None,
    }
}

/// Converts a winit scroll into the wheel convention used by the controls.
pub fn wheel_delta(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

struct WindowState {
    window: Arc<Window>,
    driver: FrameDriver<WgpuBackend, RedrawRequester>,
    notify_tx: Sender<WindowNotification>,
    cursor: Option<PhysicalPosition<f64>>,
    scale_factor: f64,
    max_pixel_ratio: f32,
}

impl WindowState {
    fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        notify_tx: Sender<WindowNotification>,
    ) -> Result<Self> {
        let size = window.inner_size();
        let scale_factor = window.scale_factor();
        let surface = RenderSurface::initialize(
            window.as_ref(),
            size.width,
            size.height,
            render_scale(scale_factor, config.max_pixel_ratio),
        )?;
        let options = PipelineOptions {
            camera: config.camera,
            noise: config.noise,
            ..PipelineOptions::default()
        };
        let mut driver = FrameDriver::new(
            surface,
            options,
            Box::new(SystemTimeSource::new()),
            RedrawRequester::new(window.clone()),
        )?;

        let listener_tx = notify_tx.clone();
        driver.on_settings_change(move |settings| {
            let _ = listener_tx.send(WindowNotification::NoiseChanged(*settings));
        });

        Ok(Self {
            window,
            driver,
            notify_tx,
            cursor: None,
            scale_factor,
            max_pixel_ratio: config.max_pixel_ratio,
        })
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let scale = render_scale(self.scale_factor, self.max_pixel_ratio);
        self.driver.resize(size.width, size.height, scale);
    }

    fn apply(&mut self, command: WindowCommand) -> bool {
        match command {
            WindowCommand::UpdateNoise(settings) => {
                self.driver.update_noise_settings(settings);
            }
            WindowCommand::SetNoiseField(field, value) => {
                self.driver.set_noise_field(field, value);
            }
            WindowCommand::ResetNoise => {
                self.driver.reset_noise_settings();
            }
            WindowCommand::SetCamera(kind) => self.set_camera(kind),
            WindowCommand::ToggleCamera => {
                let next = self.driver.cameras().active_kind().toggled();
                self.set_camera(next);
            }
            WindowCommand::Shutdown => return false,
        }
        true
    }

    fn set_camera(&mut self, kind: CameraKind) {
        if self.driver.set_active_camera(kind) {
            let _ = self
                .notify_tx
                .send(WindowNotification::CameraChanged(kind));
        }
    }

    fn pointer(&mut self, event: PointerEvent) {
        self.driver.handle_pointer(event);
    }

    fn close(&mut self) {
        if !self.driver.is_disposed() {
            self.driver.dispose();
            let _ = self.notify_tx.send(WindowNotification::Closed);
        }
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>,
    notify_tx: Sender<WindowNotification>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let (width, height) = config.surface_size;
    let window = match WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let mut state = match WindowState::new(window.clone(), &config, notify_tx) {
        Ok(state) => state,
        Err(err) => {
            let wrapped = anyhow!("failed to initialise renderer: {err}");
            let message = wrapped.to_string();
            let _ = ready_tx.send(Err(anyhow!(message)));
            return Err(wrapped);
        }
    };
    state.driver.start();
    info!(
        title = %config.title,
        camera = %config.camera,
        noise = %config.noise,
        "window opened"
    );

    let _ = ready_tx.send(Ok(proxy));

    let mut result = Ok(());
    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(command) => {
                if !state.apply(command) {
                    state.close();
                    elwt.exit();
                }
            }
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        state.close();
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        if event.state != ElementState::Pressed || event.repeat {
                            return;
                        }
                        match key_action(&event.logical_key) {
                            Some(KeyAction::ToggleCamera) => {
                                state.apply(WindowCommand::ToggleCamera);
                            }
                            Some(KeyAction::ResetNoise) => {
                                state.apply(WindowCommand::ResetNoise);
                            }
                            Some(KeyAction::Close) => {
                                state.close();
                                elwt.exit();
                            }
                            None => {}
                        }
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        state.cursor = Some(position);
                        state.pointer(PointerEvent::Move {
                            x: position.x as f32,
                            y: position.y as f32,
                        });
                    }
                    WindowEvent::MouseInput {
                        state: button_state,
                        button: MouseButton::Left,
                        ..
                    } => match button_state {
                        ElementState::Pressed => {
                            if let Some(position) = state.cursor {
                                state.pointer(PointerEvent::Down {
                                    x: position.x as f32,
                                    y: position.y as f32,
                                });
                            }
                        }
                        ElementState::Released => state.pointer(PointerEvent::Up),
                    },
                    WindowEvent::CursorLeft { .. } => {
                        state.cursor = None;
                        state.pointer(PointerEvent::Up);
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        state.pointer(PointerEvent::Wheel {
                            delta_y: wheel_delta(delta),
                        });
                    }
                    WindowEvent::Resized(new_size) => {
                        state.resize(new_size);
                    }
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        state.scale_factor = scale_factor;
                        let size = state.window.inner_size();
                        state.resize(size);
                    }
                    WindowEvent::RedrawRequested => match state.driver.tick() {
                        Ok(_) => {}
                        Err(RenderError::OutOfMemory) => {
                            error!("surface out of memory; closing window");
                            state.close();
                            elwt.exit();
                        }
                        Err(err) => {
                            warn!(error = %err, "frame failed; retrying next refresh");
                            state.window.request_redraw();
                        }
                    },
                    _ => {}
                }
            }
            Event::LoopExiting => state.close(),
            _ => {}
        }
    });

    if let Err(err) = run_result {
        result = Err(anyhow!("window event loop error: {err}"));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    #[test]
    fn render_scale_caps_dense_displays() {
        assert_eq!(render_scale(1.0, 2.0), 1.0);
        assert_eq!(render_scale(2.0, 2.0), 1.0);
        assert!((render_scale(3.0, 2.0) - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(render_scale(f64::NAN, 2.0), 1.0);
        assert_eq!(render_scale(2.0, 0.0), 1.0);
    }

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(
            key_action(&Key::Character(SmolStr::new("c"))),
            Some(KeyAction::ToggleCamera)
        );
        assert_eq!(
            key_action(&Key::Character(SmolStr::new("R"))),
            Some(KeyAction::ResetNoise)
        );
        assert_eq!(
            key_action(&Key::Named(NamedKey::Escape)),
            Some(KeyAction::Close)
        );
        assert_eq!(key_action(&Key::Character(SmolStr::new("x"))), None);
    }

    #[test]
    fn scrolling_up_zooms_in() {
        assert!(wheel_delta(MouseScrollDelta::LineDelta(0.0, 1.0)) < 0.0);
        assert!(
            wheel_delta(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -12.0))) > 0.0
        );
    }
}
