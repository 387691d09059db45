use glam::Vec2;
use std::collections::HashSet;

/// Keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    Control,
    Shift,
    Escape,
    F1,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Snapshot of keyboard and mouse state for the current frame.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    keys_held: HashSet<Key>,
    keys_pressed: HashSet<Key>,
    buttons_held: HashSet<MouseButton>,
    mouse_position: Vec2,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        self.keys_held.remove(&key);
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.keys_held.contains(&key)
    }

    /// True only in the frame the key went down.
    pub fn was_key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn button_down(&mut self, button: MouseButton) {
        self.buttons_held.insert(button);
    }

    pub fn button_up(&mut self, button: MouseButton) {
        self.buttons_held.remove(&button);
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    pub fn set_mouse_position(&mut self, position: Vec2) {
        self.mouse_position = position;
    }

    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Accumulate raw mouse motion.
    pub fn mouse_moved(&mut self, delta: Vec2) {
        self.mouse_delta += delta;
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn is_mouse_moving(&self) -> bool {
        self.mouse_delta != Vec2::ZERO
    }

    /// Clear per-frame state. Held keys and buttons persist.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        *self = Self {
            mouse_position: self.mouse_position,
            ..Self::default()
        };
    }
}
