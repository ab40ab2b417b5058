use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use noiseconfig::{NoiseField, ViewerConfig};
use renderer::RendererConfig;

use crate::cli::RunArgs;
use crate::paths::AppPaths;

/// Picks `--config` when given, otherwise the discovered default location.
pub fn resolve_config_path(args: &RunArgs) -> Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Ok(AppPaths::discover()?.config_file()),
    }
}

/// Reads the viewer configuration. A missing file yields defaults.
pub fn load_config(path: &Path) -> Result<ViewerConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config file; using defaults");
            return Ok(ViewerConfig::default());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file {}", path.display()))
        }
    };
    let config = ViewerConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Folds command-line overrides into `config`. Noise values are clamped the
/// same way as values read from the file.
pub fn apply_overrides(config: &mut ViewerConfig, args: &RunArgs) -> Result<()> {
    if let Some((width, height)) = args.size {
        config.window.width = width;
        config.window.height = height;
    }
    if let Some(mode) = args.camera {
        config.camera.mode = mode;
    }
    if let Some(ratio) = args.max_pixel_ratio {
        config.window.max_pixel_ratio = ratio;
    }

    let overrides = [
        (NoiseField::Intensity, args.intensity),
        (NoiseField::Scale, args.scale),
        (NoiseField::Speed, args.speed),
        (NoiseField::Distortion, args.distortion),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            config.noise = config.noise.with(field, value);
        }
    }

    config
        .validate()
        .context("command-line overrides produced an invalid configuration")?;
    Ok(())
}

pub fn renderer_config(config: &ViewerConfig) -> RendererConfig {
    RendererConfig {
        surface_size: (config.window.width, config.window.height),
        title: config.window.title.clone(),
        camera: config.camera.mode.into(),
        noise: config.noise,
        max_pixel_ratio: config.window.max_pixel_ratio,
    }
}
