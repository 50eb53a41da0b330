//! Keyboard and mouse state collected from window events, read once per frame.

use std::collections::HashSet;

use crate::math::Vec2f;

/// Keys the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Space,
    Escape,
    /// Wireframe toggle.
    W,
    /// Depth view toggle.
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// Held keys persist across frames; press and release edges and the mouse
/// movement only live until `end_frame`.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    down: HashSet<Key>,
    pressed: HashSet<Key>,
    released: HashSet<Key>,
    buttons: HashSet<MouseButton>,
    mouse_delta: Vec2f,
    cursor: Option<Vec2f>,
}

impl InputState {
    pub fn new() -> Self {
        return Self::default();
    }

    /// Key repeat while held doesn't produce new presses.
    pub fn press(&mut self, key: Key) {
        if self.down.insert(key) {
            self.pressed.insert(key);
        }
    }

    pub fn release(&mut self, key: Key) {
        if self.down.remove(&key) {
            self.released.insert(key);
        }
    }

    pub fn is_down(&self, key: Key) -> bool {
        return self.down.contains(&key);
    }

    /// Went down during the current frame.
    pub fn was_pressed(&self, key: Key) -> bool {
        return self.pressed.contains(&key);
    }

    /// Went up during the current frame.
    pub fn was_released(&self, key: Key) -> bool {
        return self.released.contains(&key);
    }

    pub fn press_button(&mut self, button: MouseButton) {
        self.buttons.insert(button);
    }

    pub fn release_button(&mut self, button: MouseButton) {
        self.buttons.remove(&button);
    }

    pub fn is_button_down(&self, button: MouseButton) -> bool {
        return self.buttons.contains(&button);
    }

    /// Records the cursor position, accumulating the movement since the last one.
    pub fn move_cursor(&mut self, position: Vec2f) {
        if let Some(last) = self.cursor {
            self.mouse_delta += position - last;
        }
        self.cursor = Some(position);
    }

    /// Cursor left the window, the next position starts a fresh track.
    pub fn leave(&mut self) {
        self.cursor = None;
    }

    /// Cursor movement accumulated during the current frame.
    pub fn mouse_delta(&self) -> Vec2f {
        return self.mouse_delta;
    }

    /// Drops the per-frame edges and the accumulated movement.
    pub fn end_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
        self.mouse_delta = Vec2f::zeros();
    }
}
