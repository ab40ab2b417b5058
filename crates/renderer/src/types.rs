use noiseconfig::{CameraMode, NoiseSettings};

/// Selects one of the two cameras kept alive by [`crate::CameraSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraKind {
    #[default]
    Perspective,
    Orthographic,
}

impl CameraKind {
    pub fn toggled(self) -> Self {
        match self {
            CameraKind::Perspective => CameraKind::Orthographic,
            CameraKind::Orthographic => CameraKind::Perspective,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CameraKind::Perspective => "perspective",
            CameraKind::Orthographic => "orthographic",
        }
    }
}

impl From<CameraMode> for CameraKind {
    fn from(mode: CameraMode) -> Self {
        match mode {
            CameraMode::Perspective => CameraKind::Perspective,
            CameraMode::Orthographic => CameraKind::Orthographic,
        }
    }
}

impl std::fmt::Display for CameraKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical surface dimensions plus the device pixel ratio.
///
/// Camera aspect ratios are derived from the logical size; GPU buffers are
/// allocated at [`SurfaceSize::framebuffer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
}

impl SurfaceSize {
    /// Non-finite or non-positive ratios fall back to 1.0.
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    pub fn framebuffer(&self) -> FramebufferSize {
        FramebufferSize {
            width: ((self.width as f32 * self.pixel_ratio).round() as u32).max(1),
            height: ((self.height as f32 * self.pixel_ratio).round() as u32).max(1),
        }
    }
}

/// Physical pixel dimensions of a GPU color buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferSize {
    pub width: u32,
    pub height: u32,
}

impl FramebufferSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Limits both dimensions to `limit`, the device's largest 2D texture.
    pub fn clamped_to(self, limit: u32) -> Self {
        let limit = limit.max(1);
        Self::new(self.width.min(limit), self.height.min(limit))
    }
}

/// Immutable configuration passed to the window runtime at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Requested window size in logical pixels.
    pub surface_size: (u32, u32),
    pub title: String,
    /// Camera that drives rendering when the window opens.
    pub camera: CameraKind,
    /// Noise settings applied before the first frame.
    pub noise: NoiseSettings,
    /// Upper bound applied to the display scale factor.
    pub max_pixel_ratio: f32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "torusglow".to_string(),
            camera: CameraKind::default(),
            noise: NoiseSettings::DEFAULT,
            max_pixel_ratio: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_respects_device_limit() {
        let size = FramebufferSize::new(9000, 300);
        assert_eq!(size.clamped_to(8192), FramebufferSize::new(8192, 300));
        assert_eq!(size.clamped_to(16384), size);
        assert_eq!(size.clamped_to(0), FramebufferSize::new(1, 1));
    }

    #[test]
    fn framebuffer_scales_by_pixel_ratio() {
        let size = SurfaceSize::new(800, 600, 2.0);
        assert_eq!(size.framebuffer(), FramebufferSize::new(1600, 1200));
        assert!((size.aspect() - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_pixel_ratio_falls_back_to_one() {
        assert_eq!(SurfaceSize::new(10, 10, 0.0).pixel_ratio, 1.0);
        assert_eq!(SurfaceSize::new(10, 10, f32::NAN).pixel_ratio, 1.0);
        assert_eq!(SurfaceSize::new(10, 10, -2.0).pixel_ratio, 1.0);
    }

    #[test]
    fn camera_kind_toggles() {
        assert_eq!(CameraKind::Perspective.toggled(), CameraKind::Orthographic);
        assert_eq!(CameraKind::Orthographic.toggled(), CameraKind::Perspective);
        assert_eq!(CameraKind::from(CameraMode::Orthographic), CameraKind::Orthographic);
    }
}
