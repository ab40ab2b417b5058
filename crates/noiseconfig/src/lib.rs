//! Noise parameters and viewer configuration for torusglow.
//!
//! `NoiseSettings` is the closed four-field parameter set fed into the
//! post-processing noise pass. Every value that leaves this crate has been
//! clamped to the field's declared range, so downstream code never has to
//! re-check bounds. `ViewerConfig` is the optional TOML file the binary loads
//! at start-up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("unknown noise field '{0}'; expected intensity, scale, speed, or distortion")]
    UnknownField(String),
}

/// The four recognised noise parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseField {
    Intensity,
    Scale,
    Speed,
    Distortion,
}

impl NoiseField {
    pub const ALL: [NoiseField; 4] = [
        NoiseField::Intensity,
        NoiseField::Scale,
        NoiseField::Speed,
        NoiseField::Distortion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NoiseField::Intensity => "intensity",
            NoiseField::Scale => "scale",
            NoiseField::Speed => "speed",
            NoiseField::Distortion => "distortion",
        }
    }

    /// Inclusive `(min, max)` bounds.
    pub fn bounds(self) -> (f32, f32) {
        match self {
            NoiseField::Intensity => (0.0, 1.0),
            NoiseField::Scale => (1.0, 200.0),
            NoiseField::Speed => (0.0, 10.0),
            NoiseField::Distortion => (0.0, 10.0),
        }
    }

    /// Slider increment used by control panels.
    pub fn step(self) -> f32 {
        match self {
            NoiseField::Intensity => 0.001,
            NoiseField::Scale => 0.5,
            NoiseField::Speed => 0.01,
            NoiseField::Distortion => 0.01,
        }
    }

    /// Decimal places shown when the value is displayed.
    pub fn precision(self) -> usize {
        match self {
            NoiseField::Intensity => 3,
            NoiseField::Scale => 1,
            NoiseField::Speed => 2,
            NoiseField::Distortion => 3,
        }
    }

    pub fn default_value(self) -> f32 {
        NoiseSettings::DEFAULT.get(self)
    }

    /// Clamps `value` into range. NaN has no sensible position inside the
    /// range and resolves to the field default; infinities saturate.
    pub fn clamp(self, value: f32) -> f32 {
        if value.is_nan() {
            return self.default_value();
        }
        let (min, max) = self.bounds();
        value.clamp(min, max)
    }
}

impl fmt::Display for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NoiseField {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "intensity" => Ok(NoiseField::Intensity),
            "scale" => Ok(NoiseField::Scale),
            "speed" => Ok(NoiseField::Speed),
            "distortion" => Ok(NoiseField::Distortion),
            _ => Err(ConfigError::UnknownField(value.trim().to_string())),
        }
    }
}

/// Parameters of the post-processing noise pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoiseSettings {
    pub intensity: f32,
    pub scale: f32,
    pub speed: f32,
    pub distortion: f32,
}

impl NoiseSettings {
    pub const DEFAULT: NoiseSettings = NoiseSettings {
        intensity: 0.037,
        scale: 37.0,
        speed: 0.0,
        distortion: 0.05,
    };

    pub fn new(intensity: f32, scale: f32, speed: f32, distortion: f32) -> Self {
        Self {
            intensity,
            scale,
            speed,
            distortion,
        }
    }

    pub fn get(&self, field: NoiseField) -> f32 {
        match field {
            NoiseField::Intensity => self.intensity,
            NoiseField::Scale => self.scale,
            NoiseField::Speed => self.speed,
            NoiseField::Distortion => self.distortion,
        }
    }

    /// Returns a copy with every field clamped into its bounds.
    pub fn clamped(self) -> Self {
        Self {
            intensity: NoiseField::Intensity.clamp(self.intensity),
            scale: NoiseField::Scale.clamp(self.scale),
            speed: NoiseField::Speed.clamp(self.speed),
            distortion: NoiseField::Distortion.clamp(self.distortion),
        }
    }

    /// Returns a clamped copy with one field replaced.
    pub fn with(self, field: NoiseField, value: f32) -> Self {
        let mut next = self;
        match field {
            NoiseField::Intensity => next.intensity = value,
            NoiseField::Scale => next.scale = value,
            NoiseField::Speed => next.speed = value,
            NoiseField::Distortion => next.distortion = value,
        }
        next.clamped()
    }

    pub fn is_within_bounds(&self) -> bool {
        NoiseField::ALL.iter().all(|&field| {
            let value = self.get(field);
            let (min, max) = field.bounds();
            value >= min && value <= max
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for field in NoiseField::ALL {
            if !self.get(field).is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "noise.{field} must be a finite number"
                )));
            }
        }
        Ok(())
    }
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for NoiseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in NoiseField::ALL {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(
                f,
                "{}={:.*}",
                field.name(),
                field.precision(),
                self.get(field)
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    #[default]
    Perspective,
    Orthographic,
}

impl FromStr for CameraMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "perspective" | "persp" => Ok(CameraMode::Perspective),
            "orthographic" | "ortho" => Ok(CameraMode::Orthographic),
            other => Err(format!(
                "unknown camera mode '{other}'; expected perspective or orthographic"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSection {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub max_pixel_ratio: f32,
}

impl Default for WindowSection {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "torusglow".to_string(),
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSection {
    pub mode: CameraMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub version: u32,
    pub window: WindowSection,
    pub camera: CameraSection,
    pub noise: NoiseSettings,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            window: WindowSection::default(),
            camera: CameraSection::default(),
            noise: NoiseSettings::DEFAULT,
        }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let mut raw: ViewerConfig = toml::from_str(input)?;
        raw.validate()?;
        raw.noise = raw.noise.clamped();
        Ok(raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(
                "window dimensions must be greater than zero".into(),
            ));
        }

        let ratio = self.window.max_pixel_ratio;
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(ConfigError::Invalid(
                "window.max_pixel_ratio must be a positive number".into(),
            ));
        }

        self.noise.validate()
    }
}
