use bitflags::bitflags;
use glam::Vec2;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, KeyCode, NamedKey, PhysicalKey};

bitflags! {
    /// Movement keys that walk mode reads once per frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NavKeys: u8 {
        const FORWARD = 1 << 0;
        const BACK = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
        const SPRINT = 1 << 4;
        const ASCEND = 1 << 5;
        const DESCEND = 1 << 6;
    }
}

/// Held-key snapshot. A flag is set iff its bound key is currently down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    held: NavKeys,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_held(held: NavKeys) -> Self {
        Self { held }
    }

    pub fn set(&mut self, keys: NavKeys, pressed: bool) {
        self.held.set(keys, pressed);
    }

    pub fn held(&self) -> NavKeys {
        self.held
    }

    pub fn is_held(&self, keys: NavKeys) -> bool {
        self.held.contains(keys)
    }

    pub fn forward(&self) -> bool {
        self.is_held(NavKeys::FORWARD)
    }
    pub fn back(&self) -> bool {
        self.is_held(NavKeys::BACK)
    }
    pub fn left(&self) -> bool {
        self.is_held(NavKeys::LEFT)
    }
    pub fn right(&self) -> bool {
        self.is_held(NavKeys::RIGHT)
    }
    pub fn sprint(&self) -> bool {
        self.is_held(NavKeys::SPRINT)
    }
    pub fn ascend(&self) -> bool {
        self.is_held(NavKeys::ASCEND)
    }
    pub fn descend(&self) -> bool {
        self.is_held(NavKeys::DESCEND)
    }
}

/// Named viewer actions that a key press can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiAction {
    EnterWalk,
    EnterOrbit,
    ResetView,
    ToggleOverlays,
}

/// Identity of a held key. Physical codes keep left and right variants of a key apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum KeySource {
    Physical(KeyCode),
    Logical(BoundKey),
}

/// Key bindings plus the per-frame pointer accumulators.
pub struct Input {
    keymap: KeyMap,
    state: InputState,
    // Movement flags each currently held key contributes, recorded at press time.
    held_by: HashMap<KeySource, NavKeys>,
    look_delta: Vec2,
    drag_delta: Vec2,
    pan_delta: Vec2,
    wheel: f32,
    cursor_pos: Option<Vec2>,
    left_pressed: bool,
    right_pressed: bool,
    left_clicked: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads key remaps from a JSON file. Unreadable files leave the default keys in place.
    pub fn with_bindings_file(path: impl AsRef<Path>) -> Self {
        Self::with_keymap(KeyMap::load_or_default(path.as_ref()))
    }

    fn with_keymap(keymap: KeyMap) -> Self {
        Self {
            keymap,
            state: InputState::default(),
            held_by: HashMap::new(),
            look_delta: Vec2::ZERO,
            drag_delta: Vec2::ZERO,
            pan_delta: Vec2::ZERO,
            wheel: 0.0,
            cursor_pos: None,
            left_pressed: false,
            right_pressed: false,
            left_clicked: false,
        }
    }

    /// Applies one platform event. Returns the UI action bound to a freshly pressed key.
    pub fn push(&mut self, ev: &InputEvent) -> Option<UiAction> {
        match ev {
            InputEvent::Key { key, code, pressed } => return self.apply_key(key, *code, *pressed),
            InputEvent::MouseMove { dx, dy } => {
                self.look_delta += Vec2::new(*dx, *dy);
            }
            InputEvent::Wheel { delta } => {
                self.wheel += *delta;
            }
            InputEvent::MouseButton { button: MouseButton::Left, pressed } => {
                if *pressed {
                    self.left_clicked = true;
                }
                self.left_pressed = *pressed;
            }
            InputEvent::MouseButton { button: MouseButton::Right, pressed } => {
                self.right_pressed = *pressed;
            }
            InputEvent::MouseButton { .. } => {}
            InputEvent::CursorPos { x, y } => {
                let pos = Vec2::new(*x, *y);
                if let Some(prev) = self.cursor_pos {
                    if self.left_pressed {
                        self.drag_delta += pos - prev;
                    } else if self.right_pressed {
                        self.pan_delta += pos - prev;
                    }
                }
                self.cursor_pos = Some(pos);
            }
            InputEvent::Other => {}
        }
        None
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn clear_frame(&mut self) {
        self.look_delta = Vec2::ZERO;
        self.drag_delta = Vec2::ZERO;
        self.pan_delta = Vec2::ZERO;
        self.wheel = 0.0;
        self.left_clicked = false;
    }

    pub fn take_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    pub fn take_drag_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.drag_delta)
    }

    /// Pointer travel with only the right button held.
    pub fn take_pan_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.pan_delta)
    }

    /// Wheel steps since the last frame, if the wheel moved at all.
    pub fn take_wheel_steps(&mut self) -> Option<f32> {
        let steps = std::mem::take(&mut self.wheel);
        (steps != 0.0).then_some(steps)
    }

    pub fn take_left_click(&mut self) -> bool {
        std::mem::take(&mut self.left_clicked)
    }

    pub fn left_held(&self) -> bool {
        self.left_pressed
    }

    fn apply_key(&mut self, key: &Key, code: Option<KeyCode>, pressed: bool) -> Option<UiAction> {
        let bound = BoundKey::from_logical(key);
        let source = match (code, bound) {
            (Some(code), _) => KeySource::Physical(code),
            (None, Some(bound)) => KeySource::Logical(bound),
            (None, None) => return None,
        };
        if !pressed {
            // Release by identity: the logical key may differ from the one seen at press time.
            if self.held_by.remove(&source).is_some() {
                self.refresh_held();
            }
            return None;
        }
        let mut moves = NavKeys::empty();
        let mut triggered = None;
        for binding in bound.map(|bound| self.keymap.lookup(bound)).unwrap_or(&[]) {
            match *binding {
                Binding::Move(keys) => moves |= keys,
                Binding::Ui(action) => triggered = Some(action),
            }
        }
        if !moves.is_empty() {
            self.held_by.insert(source, moves);
            self.refresh_held();
        }
        triggered
    }

    fn refresh_held(&mut self) {
        let held = self.held_by.values().fold(NavKeys::empty(), |acc, keys| acc | *keys);
        self.state = InputState::with_held(held);
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_keymap(KeyMap::default())
    }
}

/// What a bound key drives: a held movement flag or a one-shot viewer action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Move(NavKeys),
    Ui(UiAction),
}

/// Action names accepted in the remap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BindingName {
    Forward,
    Back,
    Left,
    Right,
    Sprint,
    Ascend,
    Descend,
    EnterWalk,
    EnterOrbit,
    ResetView,
    ToggleOverlays,
}

impl BindingName {
    fn binding(self) -> Binding {
        match self {
            BindingName::Forward => Binding::Move(NavKeys::FORWARD),
            BindingName::Back => Binding::Move(NavKeys::BACK),
            BindingName::Left => Binding::Move(NavKeys::LEFT),
            BindingName::Right => Binding::Move(NavKeys::RIGHT),
            BindingName::Sprint => Binding::Move(NavKeys::SPRINT),
            BindingName::Ascend => Binding::Move(NavKeys::ASCEND),
            BindingName::Descend => Binding::Move(NavKeys::DESCEND),
            BindingName::EnterWalk => Binding::Ui(UiAction::EnterWalk),
            BindingName::EnterOrbit => Binding::Ui(UiAction::EnterOrbit),
            BindingName::ResetView => Binding::Ui(UiAction::ResetView),
            BindingName::ToggleOverlays => Binding::Ui(UiAction::ToggleOverlays),
        }
    }
}

impl FromStr for BindingName {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = match raw.trim().to_lowercase().as_str() {
            "forward" => BindingName::Forward,
            "back" | "backward" => BindingName::Back,
            "left" => BindingName::Left,
            "right" => BindingName::Right,
            "sprint" => BindingName::Sprint,
            "ascend" => BindingName::Ascend,
            "descend" => BindingName::Descend,
            "enter_walk" => BindingName::EnterWalk,
            "enter_orbit" => BindingName::EnterOrbit,
            "reset_view" => BindingName::ResetView,
            "toggle_overlays" => BindingName::ToggleOverlays,
            _ => return Err(format!("unknown action '{raw}'")),
        };
        Ok(name)
    }
}

/// A physical key as the key map sees it. Characters are stored lowercased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BoundKey {
    Char(char),
    Space,
    Shift,
    Control,
}

impl BoundKey {
    fn from_logical(key: &Key) -> Option<Self> {
        match key {
            Key::Character(text) => {
                let mut chars = text.chars().flat_map(char::to_lowercase);
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Some(BoundKey::Char(ch)),
                    _ => None,
                }
            }
            Key::Named(NamedKey::Space) => Some(BoundKey::Space),
            Key::Named(NamedKey::Shift) => Some(BoundKey::Shift),
            Key::Named(NamedKey::Control) => Some(BoundKey::Control),
            _ => None,
        }
    }
}

impl FromStr for BoundKey {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lowered = raw.trim().to_lowercase();
        match lowered.as_str() {
            "space" => return Ok(BoundKey::Space),
            "shift" | "left_shift" | "right_shift" => return Ok(BoundKey::Shift),
            "ctrl" | "control" | "left_ctrl" | "right_ctrl" => return Ok(BoundKey::Control),
            _ => {}
        }
        let mut chars = lowered.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Ok(BoundKey::Char(ch)),
            _ => Err(format!("unknown key '{raw}'")),
        }
    }
}

const DEFAULT_KEYS: [(BindingName, BoundKey); 11] = [
    (BindingName::Forward, BoundKey::Char('w')),
    (BindingName::Back, BoundKey::Char('s')),
    (BindingName::Left, BoundKey::Char('a')),
    (BindingName::Right, BoundKey::Char('d')),
    (BindingName::Sprint, BoundKey::Shift),
    (BindingName::Ascend, BoundKey::Space),
    (BindingName::Descend, BoundKey::Char('c')),
    (BindingName::EnterWalk, BoundKey::Char('1')),
    (BindingName::EnterOrbit, BoundKey::Char('2')),
    (BindingName::ResetView, BoundKey::Char('r')),
    (BindingName::ToggleOverlays, BoundKey::Char('o')),
];

/// Key lookup table. Several keys may drive one action and one key may drive several.
#[derive(Debug, Clone)]
struct KeyMap {
    by_key: HashMap<BoundKey, Vec<Binding>>,
}

impl KeyMap {
    fn load_or_default(path: &Path) -> Self {
        let file = fs::read_to_string(path)
            .map_err(|err| err.to_string())
            .and_then(|text| serde_json::from_str::<KeyMapFile>(&text).map_err(|err| err.to_string()));
        match file {
            Ok(file) => Self::with_remaps(file.remaps(&path.display().to_string())),
            Err(err) => {
                warn!("[input] {}: {err}. Using default key bindings.", path.display());
                Self::default()
            }
        }
    }

    /// Remapped actions replace their default keys. Everything else keeps its default.
    fn with_remaps(remaps: HashMap<BindingName, Vec<BoundKey>>) -> Self {
        let mut table: HashMap<BindingName, Vec<BoundKey>> =
            DEFAULT_KEYS.iter().map(|&(name, key)| (name, vec![key])).collect();
        table.extend(remaps);
        let mut by_key: HashMap<BoundKey, Vec<Binding>> = HashMap::new();
        for (name, keys) in table {
            for key in keys {
                by_key.entry(key).or_default().push(name.binding());
            }
        }
        Self { by_key }
    }

    fn lookup(&self, key: BoundKey) -> &[Binding] {
        self.by_key.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::with_remaps(HashMap::new())
    }
}

/// On-disk remap file: `{"bindings": {"forward": ["w", "up"], ...}}`.
#[derive(Debug, Deserialize)]
struct KeyMapFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl KeyMapFile {
    fn remaps(self, origin: &str) -> HashMap<BindingName, Vec<BoundKey>> {
        let mut remaps = HashMap::new();
        for (raw_name, raw_keys) in self.bindings {
            let name = match raw_name.parse::<BindingName>() {
                Ok(name) => name,
                Err(err) => {
                    warn!("[input] {origin}: {err}, ignoring.");
                    continue;
                }
            };
            let keys: Vec<BoundKey> = raw_keys
                .iter()
                .filter_map(|raw| match raw.parse::<BoundKey>() {
                    Ok(key) => Some(key),
                    Err(err) => {
                        warn!("[input] {origin}: {err} for '{raw_name}', ignoring.");
                        None
                    }
                })
                .collect();
            if keys.is_empty() {
                warn!("[input] {origin}: '{raw_name}' has no usable keys, keeping defaults.");
                continue;
            }
            remaps.insert(name, keys);
        }
        remaps
    }
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    /// `code` is the physical key when the platform reports one.
    Key { key: Key, code: Option<KeyCode>, pressed: bool },
    MouseMove { dx: f32, dy: f32 },
    Wheel { delta: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    CursorPos { x: f32, y: f32 },
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / 40.0) as f32,
                };
                InputEvent::Wheel { delta: d }
            }
            WindowEvent::CursorMoved { position, .. } => {
                InputEvent::CursorPos { x: position.x as f32, y: position.y as f32 }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::KeyboardInput { event, .. } if !event.repeat => InputEvent::Key {
                key: event.logical_key.clone(),
                code: match event.physical_key {
                    PhysicalKey::Code(code) => Some(code),
                    PhysicalKey::Unidentified(_) => None,
                },
                pressed: event.state == ElementState::Pressed,
            },
            _ => InputEvent::Other,
        }
    }

    pub fn from_device_event(ev: &DeviceEvent) -> Self {
        match ev {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                InputEvent::MouseMove { dx: *dx as f32, dy: *dy as f32 }
            }
            _ => InputEvent::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ch: &str, pressed: bool) -> InputEvent {
        InputEvent::Key { key: Key::Character(ch.into()), code: None, pressed }
    }

    #[test]
    fn last_event_per_key_wins() {
        let mut input = Input::new();
        input.push(&key("w", true));
        input.push(&key("d", true));
        input.push(&key("w", false));
        input.push(&key("d", true));
        assert_eq!(input.state().held(), NavKeys::RIGHT);
        input.push(&key("d", false));
        assert!(input.state().held().is_empty());
    }

    #[test]
    fn release_without_press_leaves_flag_clear() {
        let mut input = Input::new();
        input.push(&key("s", false));
        input.push(&InputEvent::Key { key: Key::Named(NamedKey::Shift), code: None, pressed: false });
        assert!(!input.state().back());
        assert!(!input.state().sprint());
    }

    #[test]
    fn uppercase_characters_map_to_same_binding() {
        let mut input = Input::new();
        input.push(&key("W", true));
        assert!(input.state().forward());
        input.push(&key("w", false));
        assert!(!input.state().forward());
    }

    #[test]
    fn ui_action_fires_on_press_only() {
        let mut input = Input::new();
        assert_eq!(input.push(&key("1", true)), Some(UiAction::EnterWalk));
        assert_eq!(input.push(&key("1", false)), None);
        assert_eq!(input.push(&key("o", true)), Some(UiAction::ToggleOverlays));
        assert!(input.state().held().is_empty(), "ui actions never touch held keys");
    }

    #[test]
    fn remap_entries_parse_names_and_keys() {
        assert_eq!(" Backward ".parse::<BindingName>(), Ok(BindingName::Back));
        assert!("jump".parse::<BindingName>().is_err());
        assert_eq!("Left_Ctrl".parse::<BoundKey>(), Ok(BoundKey::Control));
        assert_eq!("Q".parse::<BoundKey>(), Ok(BoundKey::Char('q')));
        assert!("f13".parse::<BoundKey>().is_err());
    }

    #[test]
    fn one_key_can_drive_several_moves() {
        let mut remaps = HashMap::new();
        remaps.insert(BindingName::Sprint, vec![BoundKey::Char('w')]);
        let mut input = Input::with_keymap(KeyMap::with_remaps(remaps));
        input.push(&key("w", true));
        assert_eq!(input.state().held(), NavKeys::FORWARD | NavKeys::SPRINT);
        input.push(&InputEvent::Key { key: Key::Named(NamedKey::Shift), code: None, pressed: true });
        assert_eq!(input.state().held(), NavKeys::FORWARD | NavKeys::SPRINT, "shift lost its default");
    }

    fn shift(code: KeyCode, pressed: bool) -> InputEvent {
        InputEvent::Key { key: Key::Named(NamedKey::Shift), code: Some(code), pressed }
    }

    #[test]
    fn both_shift_keys_count_separately() {
        let mut input = Input::new();
        input.push(&shift(KeyCode::ShiftLeft, true));
        input.push(&shift(KeyCode::ShiftRight, true));
        input.push(&shift(KeyCode::ShiftLeft, false));
        assert!(input.state().sprint(), "right shift is still down");
        input.push(&shift(KeyCode::ShiftRight, false));
        assert!(!input.state().sprint());
    }

    #[test]
    fn release_uses_key_recorded_at_press() {
        let mut input = Input::new();
        input.push(&InputEvent::Key { key: Key::Character("w".into()), code: Some(KeyCode::KeyW), pressed: true });
        // A modifier change between press and release can alter the logical key.
        input.push(&InputEvent::Key { key: Key::Character("W".into()), code: Some(KeyCode::KeyW), pressed: false });
        assert!(input.state().held().is_empty());
        input.push(&InputEvent::Key { key: Key::Character("q".into()), code: Some(KeyCode::KeyQ), pressed: false });
        assert!(input.state().held().is_empty());
    }

    #[test]
    fn right_drag_feeds_pan_not_orbit() {
        let mut input = Input::new();
        input.push(&InputEvent::CursorPos { x: 0.0, y: 0.0 });
        input.push(&InputEvent::MouseButton { button: MouseButton::Right, pressed: true });
        input.push(&InputEvent::CursorPos { x: 12.0, y: -4.0 });
        assert_eq!(input.take_pan_delta(), Vec2::new(12.0, -4.0));
        assert_eq!(input.take_drag_delta(), Vec2::ZERO);
        assert!(!input.take_left_click());
    }

    #[test]
    fn drag_delta_accumulates_only_while_left_held() {
        let mut input = Input::new();
        input.push(&InputEvent::CursorPos { x: 10.0, y: 10.0 });
        input.push(&InputEvent::CursorPos { x: 20.0, y: 10.0 });
        assert_eq!(input.take_drag_delta(), Vec2::ZERO);
        input.push(&InputEvent::MouseButton { button: MouseButton::Left, pressed: true });
        input.push(&InputEvent::CursorPos { x: 25.0, y: 13.0 });
        input.push(&InputEvent::CursorPos { x: 30.0, y: 16.0 });
        assert_eq!(input.take_drag_delta(), Vec2::new(10.0, 6.0));
        assert!(input.take_left_click());
        assert!(!input.take_left_click());
    }
}
