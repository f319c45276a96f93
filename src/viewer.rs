//! The navigation controller: one object owning all per-frame state, driven by events
//! between frames and by `tick` once per rendered frame.

use crate::camera3d::{Camera3D, CameraLens};
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::framing::AutoFramer;
use crate::input::{Input, InputEvent, InputState, UiAction};
use crate::loader::{LoadEvent, LoadProgress};
use crate::navigation::{NavEffect, NavigationMode, Navigator, STATUS_ORBIT};
use crate::orbit::OrbitDriver;
use crate::overlay::{OverlayRules, OverlayToggle};
use crate::scene::SceneAsset;
use crate::time::clamp_frame_dt;
use crate::walk::{WalkDriver, WalkSettings};
use glam::{Vec2, Vec3};
use log::{error, info, warn};
use winit::dpi::PhysicalSize;

pub const STATUS_LOADING: &str = "Loading model";
pub const STATUS_LOAD_FAILED: &str = "Failed to load model";

/// Requests for the platform layer, drained once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    RequestPointerCapture,
    ReleasePointerCapture,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Loading(LoadProgress),
    Loaded,
    Failed(ViewerError),
}

pub struct Viewer {
    navigator: Navigator,
    input: Input,
    overlays: OverlayToggle,
    overlay_rules: OverlayRules,
    framer: AutoFramer,
    default_camera: Vec3,
    default_target: Vec3,
    scene: Option<SceneAsset>,
    load_state: LoadState,
    status: String,
    commands: Vec<ViewerCommand>,
    viewport: PhysicalSize<u32>,
    max_dt: f32,
}

impl Viewer {
    pub fn new(config: &ViewerConfig) -> Self {
        let nav = &config.navigation;
        let lens = CameraLens::from_config(&config.lens);
        let orbit = OrbitDriver::new(
            config.default_view.camera,
            config.default_view.target,
            nav.orbit_damping,
            nav.zoom_step,
        );
        let walk = WalkDriver::new(WalkSettings::from_config(nav));
        let input = match &config.input_bindings {
            Some(path) => Input::with_bindings_file(path),
            None => Input::new(),
        };
        Self {
            navigator: Navigator::new(orbit, walk, lens),
            input,
            overlays: OverlayToggle::new(),
            overlay_rules: OverlayRules::from_config(&config.overlay),
            framer: AutoFramer::from_config(&config.framing),
            default_camera: config.default_view.camera,
            default_target: config.default_view.target,
            scene: None,
            load_state: LoadState::Pending,
            status: STATUS_ORBIT.to_string(),
            commands: Vec::new(),
            viewport: PhysicalSize::new(config.window.width, config.window.height),
            max_dt: nav.max_frame_dt,
        }
    }

    // --- named UI actions ---

    pub fn enter_walk(&mut self) {
        let effects = self.navigator.set_mode(NavigationMode::Walk);
        self.apply_effects(effects);
    }

    pub fn enter_orbit(&mut self) {
        let effects = self.navigator.set_mode(NavigationMode::Orbit);
        self.apply_effects(effects);
    }

    pub fn reset_view(&mut self) {
        let effects = self.navigator.reset(self.default_camera, self.default_target);
        self.apply_effects(effects);
    }

    pub fn toggle_overlays(&mut self) {
        let visible = self.overlays.toggle(self.scene.as_mut());
        info!("[viewer] overlays {}", if visible { "shown" } else { "hidden" });
    }

    pub fn perform(&mut self, action: UiAction) {
        match action {
            UiAction::EnterWalk => self.enter_walk(),
            UiAction::EnterOrbit => self.enter_orbit(),
            UiAction::ResetView => self.reset_view(),
            UiAction::ToggleOverlays => self.toggle_overlays(),
        }
    }

    // --- per-frame tick ---

    /// Advances navigation by one frame. Never fails; `dt` is capped again as a guard.
    pub fn tick(&mut self, dt: f32) {
        let dt = clamp_frame_dt(dt, self.max_dt);
        let drag = self.input.take_drag_delta();
        if drag != Vec2::ZERO {
            self.navigator.on_pointer_drag(drag, self.viewport.height as f32);
        }
        let pan = self.input.take_pan_delta();
        if pan != Vec2::ZERO {
            self.navigator.on_pointer_pan(pan, self.viewport.height as f32);
        }
        let look = self.input.take_look_delta();
        if look != Vec2::ZERO {
            self.navigator.on_look(look);
        }
        if let Some(steps) = self.input.take_wheel_steps() {
            self.navigator.on_wheel(steps);
        }
        self.navigator.frame(self.input.state(), dt);
        self.input.clear_frame();
    }

    // --- event handlers ---

    /// Routes one platform input event. Key presses bound to UI actions run them immediately.
    pub fn handle_input(&mut self, event: &InputEvent) {
        if let Some(action) = self.input.push(event) {
            self.perform(action);
        }
        if self.input.take_left_click() {
            self.on_canvas_click();
        }
    }

    pub fn on_canvas_click(&mut self) {
        if let Some(effect) = self.navigator.on_canvas_click() {
            self.apply_effects(vec![effect]);
        }
    }

    pub fn on_pointer_lock_changed(&mut self, locked: bool) {
        let effects = self.navigator.on_pointer_lock_changed(locked);
        self.apply_effects(effects);
    }

    /// The platform refused capture. The status line stays as it was so the user can click again.
    pub fn on_pointer_capture_denied(&mut self, reason: impl Into<String>) {
        let err = ViewerError::PointerCaptureDenied(reason.into());
        warn!("[viewer] {err}");
    }

    pub fn on_resize(&mut self, size: PhysicalSize<u32>) {
        self.viewport = size;
    }

    pub fn on_load_event(&mut self, event: LoadEvent) {
        if matches!(self.load_state, LoadState::Loaded | LoadState::Failed(_)) {
            warn!("[viewer] ignoring load event after the load finished");
            return;
        }
        match event {
            LoadEvent::Progress(progress) => {
                self.load_state = LoadState::Loading(progress);
                // Without a known total there is nothing to report; the previous message stays.
                if progress.percent().is_some() {
                    self.status = STATUS_LOADING.to_string();
                }
            }
            LoadEvent::Loaded(scene) => self.finish_load(scene),
            LoadEvent::Failed(err) => {
                error!("[viewer] {err}");
                self.status = STATUS_LOAD_FAILED.to_string();
                self.load_state = LoadState::Failed(err);
            }
        }
    }

    fn finish_load(&mut self, mut scene: SceneAsset) {
        scene.prepare_materials();
        let overlay_count = self.overlays.attach(&mut scene, &self.overlay_rules);
        match scene.bounds() {
            Some(bounds) => {
                let framing = self.framer.frame(&bounds);
                self.navigator.frame_orbit(framing.camera, framing.target);
            }
            None => warn!("[viewer] model has no mesh bounds; keeping the default view"),
        }
        info!("[viewer] model ready: {} nodes, {overlay_count} overlays", scene.len());
        self.scene = Some(scene);
        self.load_state = LoadState::Loaded;
        let effects = self.navigator.set_mode(NavigationMode::Orbit);
        self.apply_effects(effects);
        self.status = STATUS_ORBIT.to_string();
    }

    fn apply_effects(&mut self, effects: Vec<NavEffect>) {
        for effect in effects {
            match effect {
                NavEffect::Status(text) => self.status = text.to_string(),
                NavEffect::RequestPointerCapture => self.commands.push(ViewerCommand::RequestPointerCapture),
                NavEffect::ReleasePointerCapture => self.commands.push(ViewerCommand::ReleasePointerCapture),
            }
        }
    }

    // --- outputs ---

    pub fn drain_commands(&mut self) -> Vec<ViewerCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn camera(&self) -> &Camera3D {
        self.navigator.camera()
    }

    pub fn mode(&self) -> NavigationMode {
        self.navigator.mode()
    }

    pub fn pointer_locked(&self) -> bool {
        self.navigator.pointer_locked()
    }

    pub fn orbit(&self) -> &OrbitDriver {
        self.navigator.orbit()
    }

    pub fn input_state(&self) -> &InputState {
        self.input.state()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn load_percent(&self) -> Option<u8> {
        match &self.load_state {
            LoadState::Loading(progress) => progress.percent(),
            LoadState::Loaded => Some(100),
            _ => None,
        }
    }

    pub fn scene(&self) -> Option<&SceneAsset> {
        self.scene.as_ref()
    }

    pub fn overlays_visible(&self) -> bool {
        self.overlays.visible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::{STATUS_WALK_ACTIVE, STATUS_WALK_PROMPT};
    use winit::event::MouseButton;
    use winit::keyboard::Key;

    fn key(ch: &str, pressed: bool) -> InputEvent {
        InputEvent::Key { key: Key::Character(ch.into()), code: None, pressed }
    }

    fn walking_viewer() -> Viewer {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.enter_walk();
        viewer.on_canvas_click();
        assert_eq!(viewer.drain_commands(), vec![ViewerCommand::RequestPointerCapture]);
        viewer.on_pointer_lock_changed(true);
        viewer
    }

    #[test]
    fn walk_requires_capture_before_moving() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.enter_walk();
        assert_eq!(viewer.status(), STATUS_WALK_PROMPT);
        let start = viewer.camera().position;
        viewer.handle_input(&key("w", true));
        viewer.tick(0.05);
        assert_eq!(viewer.camera().position, start);
        viewer.on_canvas_click();
        viewer.on_pointer_lock_changed(true);
        assert_eq!(viewer.status(), STATUS_WALK_ACTIVE);
        viewer.tick(0.05);
        assert!(viewer.camera().position.distance(start) > 0.1);
    }

    #[test]
    fn capture_denied_keeps_status_and_allows_retry() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.enter_walk();
        viewer.on_canvas_click();
        viewer.drain_commands();
        viewer.on_pointer_capture_denied("window not focused");
        assert_eq!(viewer.status(), STATUS_WALK_PROMPT);
        viewer.on_canvas_click();
        assert_eq!(viewer.drain_commands(), vec![ViewerCommand::RequestPointerCapture]);
    }

    #[test]
    fn oversized_dt_is_capped() {
        let mut viewer = walking_viewer();
        let start = viewer.camera().position;
        viewer.handle_input(&key("w", true));
        viewer.tick(3.0);
        let moved = viewer.camera().position - start;
        assert!(Vec2::new(moved.x, moved.y).length() <= 3.2 * 0.05 + 1e-4);
    }

    #[test]
    fn ui_keys_trigger_named_actions() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.handle_input(&key("1", true));
        assert_eq!(viewer.mode(), NavigationMode::Walk);
        viewer.handle_input(&key("2", true));
        assert_eq!(viewer.mode(), NavigationMode::Orbit);
        viewer.handle_input(&key("o", true));
        assert!(!viewer.overlays_visible());
    }

    #[test]
    fn reset_from_walk_releases_and_restores_default_view() {
        let mut viewer = walking_viewer();
        viewer.handle_input(&key("w", true));
        for _ in 0..20 {
            viewer.tick(0.05);
        }
        viewer.reset_view();
        assert_eq!(viewer.drain_commands(), vec![ViewerCommand::ReleasePointerCapture]);
        assert_eq!(viewer.mode(), NavigationMode::Orbit);
        assert_eq!(viewer.orbit().target, Vec3::new(20.0, 10.0, 2.2));
        assert!(viewer.camera().position.distance(Vec3::new(10.0, -14.0, 3.2)) < 1e-3);
    }

    #[test]
    fn progress_then_failure_reports_status() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.on_load_event(LoadEvent::Progress(LoadProgress { loaded: 50, total: Some(200) }));
        assert_eq!(viewer.status(), STATUS_LOADING);
        assert_eq!(viewer.load_percent(), Some(25));
        viewer.on_load_event(LoadEvent::Failed(ViewerError::asset_load("model.glb", "truncated")));
        assert_eq!(viewer.status(), STATUS_LOAD_FAILED);
        assert!(viewer.scene().is_none());
        viewer.on_load_event(LoadEvent::Progress(LoadProgress { loaded: 60, total: Some(200) }));
        assert_eq!(viewer.status(), STATUS_LOAD_FAILED);
    }

    #[test]
    fn progress_without_total_keeps_status() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        viewer.on_load_event(LoadEvent::Progress(LoadProgress { loaded: 4096, total: None }));
        assert_eq!(viewer.status(), STATUS_ORBIT);
        assert_eq!(viewer.load_percent(), None);
        assert_eq!(viewer.load_state(), &LoadState::Loading(LoadProgress { loaded: 4096, total: None }));
        viewer.on_load_event(LoadEvent::Progress(LoadProgress { loaded: 4096, total: Some(8192) }));
        assert_eq!(viewer.status(), STATUS_LOADING);
        assert_eq!(viewer.load_percent(), Some(50));
    }

    #[test]
    fn reentering_walk_before_unlock_waits_for_new_capture() {
        let mut viewer = walking_viewer();
        viewer.enter_orbit();
        assert_eq!(viewer.drain_commands(), vec![ViewerCommand::ReleasePointerCapture]);
        viewer.enter_walk();
        assert_eq!(viewer.status(), STATUS_WALK_PROMPT);
        viewer.handle_input(&key("w", true));
        let frozen = viewer.camera().position;
        viewer.tick(0.05);
        assert_eq!(viewer.camera().position, frozen);

        viewer.on_canvas_click();
        assert_eq!(viewer.drain_commands(), vec![ViewerCommand::RequestPointerCapture]);
        viewer.on_pointer_lock_changed(true);
        assert_eq!(viewer.status(), STATUS_WALK_ACTIVE);
        viewer.tick(0.05);
        assert_ne!(viewer.camera().position, frozen);
    }

    #[test]
    fn right_drag_pans_orbit_target() {
        let mut viewer = Viewer::new(&ViewerConfig::default());
        let target = viewer.orbit().target;
        let radius = viewer.orbit().radius();
        viewer.handle_input(&InputEvent::CursorPos { x: 300.0, y: 300.0 });
        viewer.handle_input(&InputEvent::MouseButton { button: MouseButton::Right, pressed: true });
        viewer.handle_input(&InputEvent::CursorPos { x: 340.0, y: 280.0 });
        for _ in 0..10 {
            viewer.tick(0.016);
        }
        assert_ne!(viewer.orbit().target, target);
        assert!((viewer.orbit().radius() - radius).abs() < 1e-4);
        assert!(viewer.drain_commands().is_empty());
    }
}
