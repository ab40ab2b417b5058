use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use noiseconfig::CameraMode;

#[derive(Parser, Debug)]
#[command(
    name = "torusglow",
    author,
    version,
    about = "Glowing torus viewer with live post-processing noise",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Configuration file to load instead of the discovered `config.toml`.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Initial window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_surface_size)]
    pub size: Option<(u32, u32)>,

    /// Camera active when the window opens: `perspective` or `orthographic`.
    #[arg(long, value_name = "MODE", value_parser = parse_camera_mode)]
    pub camera: Option<CameraMode>,

    /// Noise intensity (0-1).
    #[arg(long, value_name = "VALUE")]
    pub intensity: Option<f32>,

    /// Noise scale (1-200).
    #[arg(long, value_name = "VALUE")]
    pub scale: Option<f32>,

    /// Noise animation speed (0-10).
    #[arg(long, value_name = "VALUE")]
    pub speed: Option<f32>,

    /// UV distortion amount (0-10).
    #[arg(long, value_name = "VALUE")]
    pub distortion: Option<f32>,

    /// Upper bound for the display scale factor used to size the framebuffer.
    #[arg(long, value_name = "RATIO")]
    pub max_pixel_ratio: Option<f32>,

    /// Do not read control commands from stdin.
    #[arg(long)]
    pub no_panel: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect the effective configuration without opening a window.
    Config(ConfigCommand),
}

#[derive(Parser, Debug)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the merged configuration (file plus flags) as TOML.
    Show,
    /// Print the configuration file location.
    Path,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(spec: &str) -> Result<(u32, u32), String> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WxH format, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| "invalid width in size specification".to_string())?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| "invalid height in size specification".to_string())?;

    if width == 0 || height == 0 {
        return Err("surface dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}

pub fn parse_camera_mode(value: &str) -> Result<CameraMode, String> {
    if value.trim().is_empty() {
        return Err("camera mode must not be empty".to_string());
    }
    value.parse()
}
