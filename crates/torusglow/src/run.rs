use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use noiseconfig::{NoiseField, NoiseSettings, ViewerConfig};
use renderer::{CameraKind, ControlHandle, WindowNotification, WindowRuntime};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cli::RunArgs;
use crate::config::{apply_overrides, load_config, renderer_config, resolve_config_path};
use crate::panel::{parse_line, PanelCommand};

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Loads the configuration file and folds in command-line overrides.
pub fn effective_config(args: &RunArgs) -> Result<ViewerConfig> {
    let path = resolve_config_path(args)?;
    let mut config = load_config(&path)?;
    apply_overrides(&mut config, args)?;
    Ok(config)
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = effective_config(&args)?;
    let renderer_config = renderer_config(&config);
    tracing::info!(
        width = renderer_config.surface_size.0,
        height = renderer_config.surface_size.1,
        camera = %renderer_config.camera,
        noise = %renderer_config.noise,
        "opening torusglow window"
    );

    let runtime = WindowRuntime::spawn(renderer_config.clone())
        .context("failed to start the render window")?;
    let snapshot = Arc::new(Mutex::new(Snapshot {
        noise: renderer_config.noise,
        camera: renderer_config.camera,
    }));

    if !args.no_panel {
        spawn_panel(runtime.control(), Arc::clone(&snapshot))?;
    }

    for notification in runtime.notifications().iter() {
        if let Ok(mut current) = snapshot.lock() {
            current.apply(&notification);
        }
        emit(&Event::from(&notification))?;
        if notification == WindowNotification::Closed {
            break;
        }
    }

    runtime.wait()
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    noise: NoiseSettings,
    camera: CameraKind,
}

impl Snapshot {
    fn apply(&mut self, notification: &WindowNotification) {
        match notification {
            WindowNotification::NoiseChanged(settings) => self.noise = *settings,
            WindowNotification::CameraChanged(kind) => self.camera = *kind,
            WindowNotification::Closed => {}
        }
    }
}

/// One JSON line on stdout per state change.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Event {
    NoiseChanged { settings: NoiseSettings },
    CameraChanged { camera: &'static str },
    State {
        settings: NoiseSettings,
        camera: &'static str,
    },
    Fields { fields: Vec<FieldInfo> },
    Closed,
}

#[derive(Debug, Serialize)]
struct FieldInfo {
    name: &'static str,
    min: f32,
    max: f32,
    step: f32,
    default: f32,
}

impl From<NoiseField> for FieldInfo {
    fn from(field: NoiseField) -> Self {
        let (min, max) = field.bounds();
        Self {
            name: field.name(),
            min,
            max,
            step: field.step(),
            default: field.default_value(),
        }
    }
}

fn field_table() -> Event {
    Event::Fields {
        fields: NoiseField::ALL.into_iter().map(FieldInfo::from).collect(),
    }
}

impl From<&WindowNotification> for Event {
    fn from(notification: &WindowNotification) -> Self {
        match notification {
            WindowNotification::NoiseChanged(settings) => Event::NoiseChanged {
                settings: *settings,
            },
            WindowNotification::CameraChanged(kind) => Event::CameraChanged {
                camera: kind.name(),
            },
            WindowNotification::Closed => Event::Closed,
        }
    }
}

fn emit(event: &Event) -> Result<()> {
    let line = serde_json::to_string(event).context("failed to encode notification")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{line}").context("failed to write notification")?;
    stdout.flush().context("failed to flush stdout")
}

fn spawn_panel(control: ControlHandle, snapshot: Arc<Mutex<Snapshot>>) -> Result<()> {
    thread::Builder::new()
        .name("torusglow-panel".into())
        .spawn(move || read_panel(control, snapshot))
        .context("failed to spawn control panel thread")?;
    Ok(())
}

fn read_panel(control: ControlHandle, snapshot: Arc<Mutex<Snapshot>>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(error = %err, "stopped reading control panel input");
                return;
            }
        };
        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                tracing::warn!(input = %line.trim(), "{message}");
                continue;
            }
        };

        if command == PanelCommand::Fields {
            if let Err(err) = emit(&field_table()) {
                tracing::warn!(error = %err, "failed to report noise fields");
            }
            continue;
        }

        if command == PanelCommand::Show {
            let current = match snapshot.lock() {
                Ok(current) => *current,
                Err(_) => return,
            };
            let event = Event::State {
                settings: current.noise,
                camera: current.camera.name(),
            };
            if let Err(err) = emit(&event) {
                tracing::warn!(error = %err, "failed to report panel state");
            }
            continue;
        }

        let Some(window_command) = command.window_command() else {
            continue;
        };
        tracing::debug!(?window_command, "forwarding panel command");
        if let Err(err) = control.send(window_command) {
            tracing::debug!(error = %err, "window closed; control panel exiting");
            return;
        }
        if command == PanelCommand::Quit {
            return;
        }
    }
    tracing::debug!("control panel input closed");
}
