use crate::camera3d::{Camera3D, CameraLens, WORLD_UP};
use glam::{Vec2, Vec3};
use std::f32::consts::{PI, TAU};

const POLAR_EPSILON: f32 = 1e-3;
const MIN_RADIUS: f32 = 0.1;
const MAX_RADIUS: f32 = 10_000.0;

/// Damped orbit around a target point. Azimuth turns about +Z, polar is measured from +Z.
#[derive(Debug, Clone)]
pub struct OrbitDriver {
    pub target: Vec3,
    radius: f32,
    azimuth: f32,
    polar: f32,
    // Angular velocity not yet applied, in radians (x = azimuth, y = polar).
    pending: Vec2,
    // Target translation not yet applied, in world units.
    pending_pan: Vec3,
    damping: f32,
    zoom_step: f32,
    enabled: bool,
}

impl OrbitDriver {
    pub fn new(position: Vec3, target: Vec3, damping: f32, zoom_step: f32) -> Self {
        let mut driver = Self {
            target,
            radius: 1.0,
            azimuth: 0.0,
            polar: PI * 0.5,
            pending: Vec2::ZERO,
            pending_pan: Vec3::ZERO,
            damping: damping.clamp(0.001, 1.0),
            zoom_step: zoom_step.clamp(0.01, 0.999),
            enabled: true,
        };
        driver.set_pose(position, target);
        driver
    }

    /// Re-derives the spherical state from a camera position and drops any residual spin.
    pub fn set_pose(&mut self, position: Vec3, target: Vec3) {
        self.target = target;
        let offset = position - target;
        self.radius = offset.length().clamp(MIN_RADIUS, MAX_RADIUS);
        self.azimuth = offset.y.atan2(offset.x);
        self.polar = if offset.length_squared() > 0.0 {
            (offset.z / offset.length()).clamp(-1.0, 1.0).acos()
        } else {
            PI * 0.5
        };
        self.polar = self.polar.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.pending = Vec2::ZERO;
        self.pending_pan = Vec3::ZERO;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.pending = Vec2::ZERO;
            self.pending_pan = Vec3::ZERO;
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.azimuth, self.polar)
    }

    pub fn is_settled(&self) -> bool {
        self.pending.length_squared() < 1e-12 && self.pending_pan.length_squared() < 1e-12
    }

    /// Feeds a pointer drag in pixels. A drag across the full viewport height turns one revolution.
    pub fn rotate(&mut self, drag: Vec2, viewport_height: f32) {
        if !self.enabled || viewport_height <= 0.0 {
            return;
        }
        self.pending -= drag * (TAU / viewport_height);
    }

    /// Feeds a screen-space pan drag in pixels. The point under the pointer follows it across
    /// the view plane at the target's depth.
    pub fn pan(&mut self, drag: Vec2, viewport_height: f32, fov_y_radians: f32) {
        if !self.enabled || viewport_height <= 0.0 {
            return;
        }
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(WORLD_UP).normalize_or_zero();
        let up = right.cross(forward);
        let units_per_pixel = 2.0 * self.radius * (fov_y_radians * 0.5).tan() / viewport_height;
        self.pending_pan += (up * drag.y - right * drag.x) * units_per_pixel;
    }

    pub fn zoom(&mut self, wheel_steps: f32) {
        if !self.enabled {
            return;
        }
        self.radius = (self.radius * self.zoom_step.powf(wheel_steps)).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    /// Applies one damping step. Must run every orbit frame so residual velocity settles.
    pub fn update(&mut self) {
        let step = self.pending * self.damping;
        self.azimuth = crate::wrap_angle(self.azimuth + step.x);
        self.polar = (self.polar + step.y).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.pending *= 1.0 - self.damping;
        self.target += self.pending_pan * self.damping;
        self.pending_pan *= 1.0 - self.damping;
    }

    pub fn position(&self) -> Vec3 {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + Vec3::new(sin_polar * cos_az, sin_polar * sin_az, cos_polar) * self.radius
    }

    pub fn to_camera(&self, lens: CameraLens) -> Camera3D {
        Camera3D::new(self.position(), self.target, lens)
    }
}
