//! Orbit/walk mode switching and the pointer-capture sub-protocol of walk mode.

use crate::camera3d::{Camera3D, CameraLens};
use crate::error::ViewerError;
use crate::input::InputState;
use crate::orbit::OrbitDriver;
use crate::walk::WalkDriver;
use glam::{Vec2, Vec3};
use log::{debug, warn};

pub const STATUS_ORBIT: &str = "Orbit mode active";
pub const STATUS_WALK_PROMPT: &str = "Click canvas to enter walk mode";
pub const STATUS_WALK_ACTIVE: &str = "Walk mode active";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavigationMode {
    #[default]
    Orbit,
    Walk,
}

impl NavigationMode {
    pub fn label(self) -> &'static str {
        match self {
            NavigationMode::Orbit => "Orbit",
            NavigationMode::Walk => "Walk",
        }
    }
}

/// Side effects a navigation step asks the surrounding viewer to carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    RequestPointerCapture,
    ReleasePointerCapture,
    Status(&'static str),
}

/// Owns the active mode, the mirrored pointer-lock flag and both drivers.
#[derive(Debug, Clone)]
pub struct Navigator {
    mode: NavigationMode,
    pointer_locked: bool,
    // Set only by a lock event received during the current walk session. A lock left over
    // from an earlier session (release requested, unlock not yet reported) never drives walking.
    walk_armed: bool,
    orbit: OrbitDriver,
    walk: WalkDriver,
    lens: CameraLens,
    camera: Camera3D,
}

impl Navigator {
    pub fn new(orbit: OrbitDriver, walk: WalkDriver, lens: CameraLens) -> Self {
        let camera = orbit.to_camera(lens);
        Self {
            mode: NavigationMode::Orbit,
            pointer_locked: false,
            walk_armed: false,
            orbit,
            walk,
            lens,
            camera,
        }
    }

    pub fn mode(&self) -> NavigationMode {
        self.mode
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    /// True while walk input actually moves the camera.
    pub fn walk_active(&self) -> bool {
        self.mode == NavigationMode::Walk && self.pointer_locked && self.walk_armed
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn orbit(&self) -> &OrbitDriver {
        &self.orbit
    }

    pub fn walk(&self) -> &WalkDriver {
        &self.walk
    }

    /// Runs the exit hook of the current mode, then the entry hook of `next`.
    pub fn set_mode(&mut self, next: NavigationMode) -> Vec<NavEffect> {
        let mut effects = Vec::new();
        if next == self.mode {
            self.check_consistency(&mut effects);
            return effects;
        }
        debug!("[viewer] {} -> {}", self.mode.label(), next.label());
        match self.mode {
            NavigationMode::Walk => self.exit_walk(&mut effects),
            NavigationMode::Orbit => self.orbit.set_enabled(false),
        }
        self.mode = next;
        match next {
            NavigationMode::Walk => {
                self.walk.seed_from_camera(&self.camera);
                effects.push(NavEffect::Status(STATUS_WALK_PROMPT));
            }
            NavigationMode::Orbit => {
                self.orbit.set_enabled(true);
                self.camera = self.orbit.to_camera(self.lens);
            }
        }
        effects
    }

    /// Forces orbit mode, then moves the orbit to `camera`/`target` regardless of prior state.
    pub fn reset(&mut self, camera: Vec3, target: Vec3) -> Vec<NavEffect> {
        let mut effects = self.set_mode(NavigationMode::Orbit);
        self.orbit.set_pose(camera, target);
        self.camera = self.orbit.to_camera(self.lens);
        effects.push(NavEffect::Status(STATUS_ORBIT));
        effects
    }

    /// Applies an auto-framed pose without touching the active mode.
    pub fn frame_orbit(&mut self, camera: Vec3, target: Vec3) {
        self.orbit.set_pose(camera, target);
        if self.mode == NavigationMode::Orbit {
            self.camera = self.orbit.to_camera(self.lens);
        }
    }

    pub fn on_canvas_click(&mut self) -> Option<NavEffect> {
        if self.mode == NavigationMode::Walk && !self.walk_active() {
            Some(NavEffect::RequestPointerCapture)
        } else {
            None
        }
    }

    /// Mirrors a platform pointer-lock change. May arrive at any time, including after a mode switch.
    /// In walk mode any lock report arms walking, even when the flag was already set.
    pub fn on_pointer_lock_changed(&mut self, locked: bool) -> Vec<NavEffect> {
        let mut effects = Vec::new();
        let changed = self.pointer_locked != locked;
        self.pointer_locked = locked;
        match (locked, self.mode) {
            (true, NavigationMode::Walk) => {
                if !self.walk_armed {
                    self.walk_armed = true;
                    effects.push(NavEffect::Status(STATUS_WALK_ACTIVE));
                }
            }
            (true, NavigationMode::Orbit) if changed => {
                warn!("[viewer] Pointer captured while in orbit mode; releasing.");
                effects.push(NavEffect::ReleasePointerCapture);
            }
            (true, NavigationMode::Orbit) => {}
            (false, mode) => {
                self.walk_armed = false;
                if changed {
                    let status = match mode {
                        NavigationMode::Walk => STATUS_WALK_PROMPT,
                        NavigationMode::Orbit => STATUS_ORBIT,
                    };
                    effects.push(NavEffect::Status(status));
                }
            }
        }
        effects
    }

    pub fn on_pointer_drag(&mut self, drag: Vec2, viewport_height: f32) {
        if self.mode == NavigationMode::Orbit {
            self.orbit.rotate(drag, viewport_height);
        }
    }

    pub fn on_pointer_pan(&mut self, drag: Vec2, viewport_height: f32) {
        if self.mode == NavigationMode::Orbit {
            self.orbit.pan(drag, viewport_height, self.lens.fov_y_radians);
        }
    }

    pub fn on_wheel(&mut self, steps: f32) {
        if self.mode == NavigationMode::Orbit {
            self.orbit.zoom(steps);
        }
    }

    pub fn on_look(&mut self, delta: Vec2) {
        if self.walk_active() {
            self.walk.look(delta);
        }
    }

    /// One frame: walk integrates only while captured, orbit damps every frame it is active,
    /// and an uncaptured walk camera stays frozen.
    pub fn frame(&mut self, input: &InputState, dt: f32) {
        match self.mode {
            NavigationMode::Walk if self.walk_active() => self.advance_walk(input, dt),
            NavigationMode::Walk => {}
            NavigationMode::Orbit => {
                self.orbit.update();
                self.camera = self.orbit.to_camera(self.lens);
            }
        }
    }

    /// Integrates one walk step and moves the camera with it.
    ///
    /// Calling this outside walk mode is a contract violation: it panics in debug builds and
    /// leaves both drivers and the camera untouched in release builds.
    pub fn advance_walk(&mut self, input: &InputState, dt: f32) {
        if let Err(err) = self.require_mode(NavigationMode::Walk, "walk advance") {
            debug_assert!(false, "{err}");
            warn!("[viewer] {err}; ignored");
            return;
        }
        self.walk.advance(input, dt);
        self.camera = self.walk.to_camera(self.lens);
    }

    fn require_mode(&self, expected: NavigationMode, operation: &'static str) -> Result<(), ViewerError> {
        if self.mode == expected {
            Ok(())
        } else {
            Err(ViewerError::InvalidModeTransition { operation, expected, actual: self.mode })
        }
    }

    fn exit_walk(&mut self, effects: &mut Vec<NavEffect>) {
        // The platform reports the actual unlock later; the flag follows that event.
        self.walk_armed = false;
        if self.pointer_locked {
            effects.push(NavEffect::ReleasePointerCapture);
        }
    }

    fn check_consistency(&self, effects: &mut Vec<NavEffect>) {
        match self.mode {
            NavigationMode::Orbit if self.pointer_locked => {
                warn!("[viewer] Orbit mode with pointer still captured; releasing.");
                effects.push(NavEffect::ReleasePointerCapture);
            }
            // A stale lock is still winding down; walking waits for a fresh capture.
            NavigationMode::Walk if self.pointer_locked && !self.walk_armed => {
                debug!("[viewer] walk re-entered while a previous capture is still releasing");
            }
            _ => {}
        }
    }
}
