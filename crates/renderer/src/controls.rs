use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::camera::CameraSet;
use crate::types::CameraKind;

pub const DAMPING_FACTOR: f32 = 0.05;
pub const MIN_DISTANCE: f32 = 1.0;
pub const MAX_DISTANCE: f32 = 10.0;
pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;
/// Dolly applied per wheel notch.
pub const ZOOM_STEP: f32 = 0.95;

const EPSILON: f32 = 1e-6;
/// Keeps the camera off the poles where the view basis degenerates.
const POLAR_MARGIN: f32 = 1e-3;

/// Pointer input in physical pixels, origin at the top-left corner. The
/// viewport height handed to [`OrbitControls`] uses the same unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up,
    /// Positive values scroll towards the user and dolly out.
    Wheel { delta_y: f32 },
}

/// Damped orbit around a fixed target, bound to exactly one camera.
///
/// Input accumulates angular and dolly velocity; every [`update`] applies a
/// `damping` share of it and decays the rest, so motion eases out over
/// subsequent frames.
///
/// [`update`]: OrbitControls::update
#[derive(Debug, Clone)]
pub struct OrbitControls {
    bound: CameraKind,
    target: Vec3,
    damping: f32,
    theta_velocity: f32,
    phi_velocity: f32,
    dolly_velocity: f32,
    drag_anchor: Option<Vec2>,
    viewport_height: f32,
    attached: bool,
}

impl OrbitControls {
    pub fn new(bound: CameraKind, viewport_height: f32) -> Self {
        Self {
            bound,
            target: Vec3::ZERO,
            damping: DAMPING_FACTOR,
            theta_velocity: 0.0,
            phi_velocity: 0.0,
            dolly_velocity: 0.0,
            drag_anchor: None,
            viewport_height: viewport_height.max(1.0),
            attached: true,
        }
    }

    pub fn bound(&self) -> CameraKind {
        self.bound
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// True when no residual motion remains.
    pub fn is_settled(&self) -> bool {
        self.theta_velocity == 0.0 && self.phi_velocity == 0.0 && self.dolly_velocity == 0.0
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if height.is_finite() && height > 0.0 {
            self.viewport_height = height;
        }
    }

    /// Ignored once the controls are disposed.
    pub fn handle(&mut self, event: PointerEvent) {
        if !self.attached {
            return;
        }
        match event {
            PointerEvent::Down { x, y } => self.drag_anchor = Some(Vec2::new(x, y)),
            PointerEvent::Move { x, y } => {
                let Some(anchor) = self.drag_anchor else {
                    return;
                };
                let position = Vec2::new(x, y);
                let delta = position - anchor;
                self.theta_velocity -= TAU * delta.x / self.viewport_height;
                self.phi_velocity -= TAU * delta.y / self.viewport_height;
                self.drag_anchor = Some(position);
            }
            PointerEvent::Up => self.drag_anchor = None,
            PointerEvent::Wheel { delta_y } => {
                if delta_y < 0.0 {
                    self.dolly_velocity += ZOOM_STEP.ln();
                } else if delta_y > 0.0 {
                    self.dolly_velocity -= ZOOM_STEP.ln();
                }
            }
        }
    }

    /// Moves the bound camera by one damped step. Returns whether anything
    /// changed.
    pub fn update(&mut self, cameras: &mut CameraSet) -> bool {
        if !self.attached || self.is_settled() {
            return false;
        }
        let camera = cameras.get_mut(self.bound);
        let offset = camera.position() - self.target;
        let radius = offset.length().max(EPSILON);
        let theta = offset.x.atan2(offset.z) + self.theta_velocity * self.damping;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).acos() + self.phi_velocity * self.damping)
            .clamp(POLAR_MARGIN, PI - POLAR_MARGIN);
        let dolly = (self.dolly_velocity * self.damping).exp();

        let radius = match camera.kind() {
            CameraKind::Perspective => (radius * dolly).clamp(MIN_DISTANCE, MAX_DISTANCE),
            CameraKind::Orthographic => {
                camera.set_zoom((camera.zoom() / dolly).clamp(MIN_ZOOM, MAX_ZOOM));
                radius.clamp(MIN_DISTANCE, MAX_DISTANCE)
            }
        };

        let sin_phi = phi.sin();
        let position = self.target
            + Vec3::new(
                radius * sin_phi * theta.sin(),
                radius * phi.cos(),
                radius * sin_phi * theta.cos(),
            );
        camera.look_from(position, self.target);

        let decay = 1.0 - self.damping;
        for velocity in [
            &mut self.theta_velocity,
            &mut self.phi_velocity,
            &mut self.dolly_velocity,
        ] {
            *velocity *= decay;
            if velocity.abs() < EPSILON {
                *velocity = 0.0;
            }
        }
        true
    }

    /// Binds to another camera. Pending motion carries over.
    pub(crate) fn rebind(&mut self, kind: CameraKind) {
        self.bound = kind;
    }

    /// Detaches from input. Safe to call more than once.
    pub fn dispose(&mut self) {
        self.attached = false;
        self.drag_anchor = None;
        self.theta_velocity = 0.0;
        self.phi_velocity = 0.0;
        self.dolly_velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DEFAULT_POSITION;

    fn drag(controls: &mut OrbitControls, dx: f32, dy: f32) {
        controls.handle(PointerEvent::Down { x: 100.0, y: 100.0 });
        controls.handle(PointerEvent::Move {
            x: 100.0 + dx,
            y: 100.0 + dy,
        });
        controls.handle(PointerEvent::Up);
    }

    #[test]
    fn update_without_input_is_a_no_op() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        assert!(!controls.update(&mut cameras));
        assert_eq!(cameras.active().position(), DEFAULT_POSITION);
    }

    #[test]
    fn drag_orbits_and_keeps_distance() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        drag(&mut controls, 60.0, 0.0);
        assert!(controls.update(&mut cameras));
        let position = cameras.active().position();
        assert!(position.x < 0.0, "dragging right orbits left: {position:?}");
        assert!((position.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn drag_rotation_is_relative_to_viewport_height() {
        let mut sharp = CameraSet::new(1.0, CameraKind::Perspective);
        let mut dense = CameraSet::new(1.0, CameraKind::Perspective);
        let mut sharp_controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        let mut dense_controls = OrbitControls::new(CameraKind::Perspective, 1200.0);
        drag(&mut sharp_controls, 40.0, 25.0);
        drag(&mut dense_controls, 80.0, 50.0);
        while sharp_controls.update(&mut sharp) | dense_controls.update(&mut dense) {}
        let delta = sharp.active().position() - dense.active().position();
        assert!(delta.length() < 1e-4, "positions diverged by {delta:?}");
    }

    #[test]
    fn damping_eases_out_over_frames() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        drag(&mut controls, 60.0, 0.0);
        let start = cameras.active().position();
        controls.update(&mut cameras);
        let first = cameras.active().position();
        controls.update(&mut cameras);
        let second = cameras.active().position();
        let first_step = (first - start).length();
        let second_step = (second - first).length();
        assert!(second_step < first_step);
        assert!(second_step > 0.0);
    }

    #[test]
    fn motion_settles_eventually() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        drag(&mut controls, 30.0, 30.0);
        let mut frames = 0;
        while controls.update(&mut cameras) {
            frames += 1;
            assert!(frames < 2_000, "controls never settled");
        }
        assert!(controls.is_settled());
    }

    #[test]
    fn perspective_dolly_respects_distance_bounds() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        for _ in 0..400 {
            controls.handle(PointerEvent::Wheel { delta_y: 1.0 });
        }
        while controls.update(&mut cameras) {}
        assert!((cameras.active().position().length() - MAX_DISTANCE).abs() < 1e-3);

        for _ in 0..800 {
            controls.handle(PointerEvent::Wheel { delta_y: -1.0 });
        }
        while controls.update(&mut cameras) {}
        assert!((cameras.active().position().length() - MIN_DISTANCE).abs() < 1e-3);
    }

    #[test]
    fn orthographic_dolly_changes_zoom() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Orthographic);
        let mut controls = OrbitControls::new(CameraKind::Orthographic, 600.0);
        controls.handle(PointerEvent::Wheel { delta_y: -1.0 });
        while controls.update(&mut cameras) {}
        let zoom = cameras.active().zoom();
        assert!((zoom - 1.0 / ZOOM_STEP).abs() < 1e-3, "zoom was {zoom}");
        assert!((cameras.active().position().length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn only_the_bound_camera_moves() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        drag(&mut controls, 60.0, 0.0);
        controls.rebind(CameraKind::Orthographic);
        controls.update(&mut cameras);
        assert_eq!(
            cameras.get(CameraKind::Perspective).position(),
            DEFAULT_POSITION
        );
        assert_ne!(
            cameras.get(CameraKind::Orthographic).position(),
            DEFAULT_POSITION
        );
    }

    #[test]
    fn disposed_controls_ignore_input() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        controls.dispose();
        controls.dispose();
        drag(&mut controls, 60.0, 0.0);
        assert!(!controls.is_attached());
        assert!(!controls.update(&mut cameras));
        assert_eq!(cameras.active().position(), DEFAULT_POSITION);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut cameras = CameraSet::new(1.0, CameraKind::Perspective);
        let mut controls = OrbitControls::new(CameraKind::Perspective, 600.0);
        drag(&mut controls, 0.0, 2_000.0);
        while controls.update(&mut cameras) {}
        let position = cameras.active().position();
        assert!(position.y.abs() <= 5.0);
        assert!(position.is_finite());
    }
}
