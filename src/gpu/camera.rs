//! Camera for 3D orbit view.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};

/// Orbit camera around the swarm.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Yaw still to turn from requested spins.
    spin_left: f32,
}

impl Camera {
    pub const MIN_DISTANCE: f32 = 0.5;
    pub const MAX_DISTANCE: f32 = 40.0;
    const MAX_PITCH: f32 = 1.5;
    /// Highest orbit point reachable with [`Camera::lift`].
    pub const MAX_LIFT: f32 = 3.0;
    /// Yaw turned per [`Camera::advance_spin`] call; a full spin takes 120.
    pub const SPIN_STEP: f32 = TAU / 120.0;

    /// Camera on the +Z axis looking at the origin from distance 6.
    pub fn new() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 6.0,
            target: Vec3::ZERO,
            fov: 35.0,
            spin_left: 0.0,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Projection times view for a viewport of `aspect` (width / height).
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective_rh(self.fov.to_radians(), aspect, 0.01, 1000.0);
        proj * self.view_matrix()
    }

    /// Rotate by a mouse drag of `(dx, dy)` pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-Self::MAX_PITCH, Self::MAX_PITCH);
    }

    /// Move toward (positive) or away from the target.
    pub fn zoom(&mut self, scroll: f32) {
        self.distance = (self.distance - scroll * 0.3).clamp(Self::MIN_DISTANCE, Self::MAX_DISTANCE);
    }

    /// Queue one full turn around the target.
    pub fn start_spin(&mut self) {
        self.spin_left += TAU;
    }

    pub fn is_spinning(&self) -> bool {
        self.spin_left > 0.0
    }

    /// Turn one step of any queued spin.
    pub fn advance_spin(&mut self) {
        let step = self.spin_left.min(Self::SPIN_STEP);
        self.yaw += step;
        self.spin_left -= step;
    }

    /// Move the orbit point up or down by `dy`.
    pub fn lift(&mut self, dy: f32) {
        self.target.y = (self.target.y + dy).clamp(-Self::MAX_LIFT, Self::MAX_LIFT);
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
