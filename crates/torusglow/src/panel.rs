//! Line-oriented control panel read from stdin.
//!
//! Each line is one command: `intensity=0.5`, `set scale 80`, `reset`,
//! `camera orthographic`, `toggle`, `show`, `fields`, `quit`. Blank lines
//! and lines starting with `#` are ignored.

use noiseconfig::{CameraMode, NoiseField};
use renderer::{CameraKind, WindowCommand};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PanelCommand {
    Set(NoiseField, f32),
    Reset,
    Camera(CameraKind),
    ToggleCamera,
    Show,
    /// Lists every field with its range, slider step, and default.
    Fields,
    Quit,
}

impl PanelCommand {
    /// Command forwarded to the window, if any. `Show` and `Fields` are
    /// answered locally.
    pub fn window_command(self) -> Option<WindowCommand> {
        match self {
            PanelCommand::Set(field, value) => Some(WindowCommand::SetNoiseField(field, value)),
            PanelCommand::Reset => Some(WindowCommand::ResetNoise),
            PanelCommand::Camera(kind) => Some(WindowCommand::SetCamera(kind)),
            PanelCommand::ToggleCamera => Some(WindowCommand::ToggleCamera),
            PanelCommand::Quit => Some(WindowCommand::Shutdown),
            PanelCommand::Show | PanelCommand::Fields => None,
        }
    }
}

pub fn parse_line(line: &str) -> Result<Option<PanelCommand>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    if let Some((name, value)) = line.split_once('=') {
        return parse_assignment(name, value).map(Some);
    }

    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let command = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("set", [name, value]) => parse_assignment(name, value)?,
        ("set", _) => return Err("usage: set <field> <value>".to_string()),
        ("reset", []) => PanelCommand::Reset,
        ("camera", [mode]) => {
            let mode: CameraMode = mode.parse()?;
            PanelCommand::Camera(mode.into())
        }
        ("camera", _) => return Err("usage: camera perspective|orthographic".to_string()),
        ("toggle", []) => PanelCommand::ToggleCamera,
        ("show", []) => PanelCommand::Show,
        ("fields", []) => PanelCommand::Fields,
        ("quit" | "exit", []) => PanelCommand::Quit,
        (name, [value]) => parse_assignment(name, value)?,
        (other, _) => return Err(format!("unrecognised command '{other}'")),
    };
    Ok(Some(command))
}

fn parse_assignment(name: &str, value: &str) -> Result<PanelCommand, String> {
    let field: NoiseField = name.parse().map_err(|err| format!("{err}"))?;
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value '{}' for {field}", value.trim()))?;
    Ok(PanelCommand::Set(field, value))
}
