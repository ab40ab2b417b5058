//! Perspective and orthographic cameras that share one scene.

use glam::{Mat4, Vec3};

use crate::types::CameraKind;

pub const DEFAULT_FOV_DEGREES: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;
/// Half of the orthographic frustum height in world units.
pub const ORTHOGRAPHIC_HALF_HEIGHT: f32 = 2.0;
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 0.0, 5.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        half_height: f32,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
        zoom: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    projection: Projection,
    position: Vec3,
    target: Vec3,
}

impl Camera {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            },
            position: DEFAULT_POSITION,
            target: Vec3::ZERO,
        }
    }

    /// Frustum spans `2 * half_height` vertically and `aspect` times that
    /// horizontally.
    pub fn orthographic(aspect: f32, half_height: f32, near: f32, far: f32) -> Self {
        let half_width = aspect * half_height;
        Self {
            projection: Projection::Orthographic {
                half_height,
                left: -half_width,
                right: half_width,
                top: half_height,
                bottom: -half_height,
                near,
                far,
                zoom: 1.0,
            },
            position: DEFAULT_POSITION,
            target: Vec3::ZERO,
        }
    }

    pub fn kind(&self) -> CameraKind {
        match self.projection {
            Projection::Perspective { .. } => CameraKind::Perspective,
            Projection::Orthographic { .. } => CameraKind::Orthographic,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub(crate) fn look_from(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn aspect(&self) -> f32 {
        match self.projection {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => (right - left) / (top - bottom),
        }
    }

    /// 1.0 for perspective cameras.
    pub fn zoom(&self) -> f32 {
        match self.projection {
            Projection::Perspective { .. } => 1.0,
            Projection::Orthographic { zoom, .. } => zoom,
        }
    }

    pub(crate) fn set_zoom(&mut self, value: f32) {
        if let Projection::Orthographic { zoom, .. } = &mut self.projection {
            *zoom = value;
        }
    }

    /// Recomputes the projection for a new viewport aspect. Non-finite or
    /// non-positive ratios are ignored.
    pub fn on_resize(&mut self, new_aspect: f32) {
        if !new_aspect.is_finite() || new_aspect <= 0.0 {
            return;
        }
        match &mut self.projection {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic {
                half_height,
                left,
                right,
                top,
                bottom,
                ..
            } => {
                let half_width = new_aspect * *half_height;
                *left = -half_width;
                *right = half_width;
                *top = *half_height;
                *bottom = -*half_height;
            }
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match self.projection {
            Projection::Perspective {
                fov_y_degrees,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
                zoom,
                ..
            } => Mat4::orthographic_rh(
                left / zoom,
                right / zoom,
                bottom / zoom,
                top / zoom,
                near,
                far,
            ),
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

/// Both cameras, kept alive for the pipeline's lifetime, and which one is
/// currently rendering.
#[derive(Debug, Clone)]
pub struct CameraSet {
    perspective: Camera,
    orthographic: Camera,
    active: CameraKind,
}

impl CameraSet {
    pub fn new(aspect: f32, active: CameraKind) -> Self {
        Self {
            perspective: Camera::perspective(DEFAULT_FOV_DEGREES, aspect, DEFAULT_NEAR, DEFAULT_FAR),
            orthographic: Camera::orthographic(
                aspect,
                ORTHOGRAPHIC_HALF_HEIGHT,
                DEFAULT_NEAR,
                DEFAULT_FAR,
            ),
            active,
        }
    }

    pub fn active_kind(&self) -> CameraKind {
        self.active
    }

    pub fn active(&self) -> &Camera {
        self.get(self.active)
    }

    pub fn get(&self, kind: CameraKind) -> &Camera {
        match kind {
            CameraKind::Perspective => &self.perspective,
            CameraKind::Orthographic => &self.orthographic,
        }
    }

    pub(crate) fn get_mut(&mut self, kind: CameraKind) -> &mut Camera {
        match kind {
            CameraKind::Perspective => &mut self.perspective,
            CameraKind::Orthographic => &mut self.orthographic,
        }
    }

    /// Only switches the selection. Callers must rebind the controls and the
    /// scene pass in the same step.
    pub(crate) fn set_active(&mut self, kind: CameraKind) -> bool {
        let changed = self.active != kind;
        self.active = kind;
        changed
    }

    /// Updates both projections so switching never shows a stale aspect.
    pub fn on_resize(&mut self, aspect: f32) {
        self.perspective.on_resize(aspect);
        self.orthographic.on_resize(aspect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthographic_width_tracks_aspect() {
        let mut camera = Camera::orthographic(1.0, ORTHOGRAPHIC_HALF_HEIGHT, 0.1, 1000.0);
        camera.on_resize(16.0 / 9.0);
        let Projection::Orthographic {
            left,
            right,
            top,
            bottom,
            ..
        } = *camera.projection()
        else {
            panic!("expected orthographic projection");
        };
        assert!((right - left - 4.0 * 16.0 / 9.0).abs() < 1e-5);
        assert_eq!(top - bottom, 4.0);
    }

    #[test]
    fn perspective_aspect_is_replaced() {
        let mut camera = Camera::perspective(75.0, 1.0, 0.1, 1000.0);
        camera.on_resize(800.0 / 600.0);
        assert!((camera.aspect() - 1.333_333).abs() < 1e-5);
    }

    #[test]
    fn degenerate_aspect_is_ignored() {
        let mut camera = Camera::perspective(75.0, 1.5, 0.1, 1000.0);
        camera.on_resize(f32::INFINITY);
        camera.on_resize(0.0);
        assert_eq!(camera.aspect(), 1.5);
    }

    #[test]
    fn set_resizes_both_cameras() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        cameras.on_resize(2.0);
        assert_eq!(cameras.get(CameraKind::Perspective).aspect(), 2.0);
        assert_eq!(cameras.get(CameraKind::Orthographic).aspect(), 2.0);
    }

    #[test]
    fn cameras_start_on_the_z_axis() {
        let cameras = CameraSet::new(1.0, CameraKind::Orthographic);
        assert_eq!(cameras.active().kind(), CameraKind::Orthographic);
        assert_eq!(cameras.active().position(), DEFAULT_POSITION);
        assert_eq!(cameras.active().target(), Vec3::ZERO);
    }

    #[test]
    fn set_active_reports_changes() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        assert!(!cameras.set_active(CameraKind::Perspective));
        assert!(cameras.set_active(CameraKind::Orthographic));
        assert_eq!(cameras.active_kind(), CameraKind::Orthographic);
    }

    #[test]
    fn zoom_only_applies_to_orthographic() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        cameras.get_mut(CameraKind::Perspective).set_zoom(3.0);
        cameras.get_mut(CameraKind::Orthographic).set_zoom(3.0);
        assert_eq!(cameras.get(CameraKind::Perspective).zoom(), 1.0);
        assert_eq!(cameras.get(CameraKind::Orthographic).zoom(), 3.0);
    }
}
