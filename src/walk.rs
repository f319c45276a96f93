use crate::camera3d::{Camera3D, CameraLens, WORLD_UP};
use crate::config::NavigationConfig;
use crate::input::InputState;
use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkSettings {
    pub base_speed: f32,
    pub sprint_speed: f32,
    pub vertical_speed: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub look_sensitivity: f32,
}

impl WalkSettings {
    pub fn from_config(config: &NavigationConfig) -> Self {
        let (min_height, max_height) = if config.min_height <= config.max_height {
            (config.min_height, config.max_height)
        } else {
            (config.max_height, config.min_height)
        };
        Self {
            base_speed: config.base_speed,
            sprint_speed: config.sprint_speed,
            vertical_speed: config.vertical_speed,
            min_height,
            max_height,
            look_sensitivity: config.look_sensitivity,
        }
    }
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self::from_config(&NavigationConfig::default())
    }
}

/// First-person walker held inside a vertical band. Yaw turns about +Z.
#[derive(Debug, Clone)]
pub struct WalkDriver {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    settings: WalkSettings,
}

impl WalkDriver {
    pub fn new(settings: WalkSettings) -> Self {
        Self { position: Vec3::ZERO, yaw: 0.0, pitch: 0.0, settings }
    }

    pub fn settings(&self) -> &WalkSettings {
        &self.settings
    }

    /// Takes over the current camera pose without moving it.
    pub fn seed_from_camera(&mut self, camera: &Camera3D) {
        let forward = camera.look_direction();
        self.position = camera.position;
        if forward.length_squared() > 0.0 {
            self.yaw = forward.y.atan2(forward.x);
            self.pitch = forward.z.clamp(-1.0, 1.0).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }
    }

    pub fn look_direction(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        Vec3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch)
    }

    /// Mouse-look from a raw pointer delta in pixels.
    pub fn look(&mut self, delta: Vec2) {
        self.yaw = crate::wrap_angle(self.yaw - delta.x * self.settings.look_sensitivity);
        self.pitch = (self.pitch - delta.y * self.settings.look_sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Integrates one frame of held keys. `dt` is expected to be clamped by the caller.
    /// Returns the applied displacement.
    pub fn advance(&mut self, input: &InputState, dt: f32) -> Vec3 {
        let start = self.position;
        let look = self.look_direction();
        let forward = Vec3::new(look.x, look.y, 0.0).normalize_or_zero();
        let right = forward.cross(WORLD_UP).normalize_or_zero();

        let mut movement = Vec3::ZERO;
        if input.forward() {
            movement += forward;
        }
        if input.back() {
            movement -= forward;
        }
        if input.right() {
            movement += right;
        }
        if input.left() {
            movement -= right;
        }
        if movement.length_squared() > 0.0 {
            let speed = if input.sprint() { self.settings.sprint_speed } else { self.settings.base_speed };
            self.position += movement.normalize() * speed * dt;
        }

        let mut vertical = 0.0;
        if input.ascend() {
            vertical += 1.0;
        }
        if input.descend() {
            vertical -= 1.0;
        }
        self.position.z += vertical * self.settings.vertical_speed * dt;
        self.position.z = self.position.z.clamp(self.settings.min_height, self.settings.max_height);

        self.position - start
    }

    pub fn to_camera(&self, lens: CameraLens) -> Camera3D {
        Camera3D::new(self.position, self.position + self.look_direction(), lens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::NavKeys;

    const DT_MAX: f32 = 0.05;

    fn walker_at(position: Vec3, yaw: f32, pitch: f32) -> WalkDriver {
        let mut walker = WalkDriver::new(WalkSettings::default());
        walker.position = position;
        walker.yaw = yaw;
        walker.pitch = pitch;
        walker
    }

    fn held(keys: NavKeys) -> InputState {
        InputState::with_held(keys)
    }

    #[test]
    fn forward_moves_along_horizontal_look() {
        let mut walker = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0);
        let moved = walker.advance(&held(NavKeys::FORWARD), 0.05);
        assert!((moved - Vec3::new(3.2 * 0.05, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn looking_down_does_not_slow_walking() {
        let mut level = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.7, 0.0);
        let mut tilted = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.7, -1.2);
        let a = level.advance(&held(NavKeys::FORWARD), 0.04);
        let b = tilted.advance(&held(NavKeys::FORWARD), 0.04);
        assert!((a - b).length() < 1e-5);
        assert_eq!(b.z, 0.0);
    }

    #[test]
    fn right_is_clockwise_from_forward() {
        let mut walker = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0);
        let moved = walker.advance(&held(NavKeys::RIGHT), 0.05);
        assert!(moved.y < 0.0 && moved.x.abs() < 1e-6);
    }

    #[test]
    fn opposite_keys_cancel() {
        for dt in [0.0, 0.001, 0.016, 0.05] {
            let mut walker = walker_at(Vec3::new(1.0, 1.0, 3.0), 0.3, 0.2);
            let keys = NavKeys::FORWARD
                | NavKeys::BACK
                | NavKeys::LEFT
                | NavKeys::RIGHT
                | NavKeys::ASCEND
                | NavKeys::DESCEND
                | NavKeys::SPRINT;
            assert_eq!(walker.advance(&held(keys), dt), Vec3::ZERO);
        }
    }

    #[test]
    fn displacement_never_exceeds_sprint_bound() {
        let settings = WalkSettings::default();
        for bits in 0..=NavKeys::all().bits() {
            let keys = NavKeys::from_bits_truncate(bits);
            let mut walker = walker_at(Vec3::new(0.0, 0.0, 5.0), 0.4, 0.1);
            let moved = walker.advance(&held(keys), DT_MAX);
            let horizontal = Vec2::new(moved.x, moved.y).length();
            assert!(horizontal <= settings.sprint_speed * DT_MAX + 1e-5, "{keys:?} moved {horizontal}");
        }
    }

    #[test]
    fn diagonal_matches_axis_speed() {
        let mut straight = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0);
        let mut diagonal = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0);
        let a = straight.advance(&held(NavKeys::FORWARD), 0.02).length();
        let b = diagonal.advance(&held(NavKeys::FORWARD | NavKeys::RIGHT), 0.02).length();
        assert!((a - b).abs() < 1e-5);
    }

    #[test]
    fn height_clamp_is_absolute() {
        for start in [-50.0, 0.0, 0.6, 5.0, 10.0, 42.0] {
            for keys in [NavKeys::empty(), NavKeys::ASCEND, NavKeys::DESCEND] {
                let mut walker = walker_at(Vec3::new(0.0, 0.0, start), 0.0, 0.0);
                walker.advance(&held(keys), 0.05);
                assert!((0.6..=10.0).contains(&walker.position.z), "start {start} ended at {}", walker.position.z);
            }
        }
    }

    #[test]
    fn ascend_raises_by_vertical_speed() {
        let mut walker = walker_at(Vec3::new(0.0, 0.0, 2.0), 0.0, 0.0);
        walker.advance(&held(NavKeys::ASCEND), 0.05);
        assert!((walker.position.z - (2.0 + 2.4 * 0.05)).abs() < 1e-5);
    }

    #[test]
    fn seeding_keeps_camera_pose() {
        let camera = Camera3D::new(Vec3::new(10.0, -14.0, 3.2), Vec3::new(20.0, 10.0, 2.2), CameraLens::default());
        let mut walker = WalkDriver::new(WalkSettings::default());
        walker.seed_from_camera(&camera);
        let seeded = walker.to_camera(camera.lens);
        assert_eq!(seeded.position, camera.position);
        assert!((seeded.look_direction() - camera.look_direction()).length() < 1e-4);
    }

    #[test]
    fn look_clamps_pitch() {
        let mut walker = walker_at(Vec3::ZERO, 0.0, 0.0);
        walker.look(Vec2::new(0.0, -100_000.0));
        assert!(walker.pitch <= PITCH_LIMIT);
        walker.look(Vec2::new(500.0, 0.0));
        assert!((walker.yaw - crate::wrap_angle(-1.0)).abs() < 1e-5);
    }
}
