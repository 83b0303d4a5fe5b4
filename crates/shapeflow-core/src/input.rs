//! Pointer and keyboard input consumed by the canvas.
//!
//! Events carry device coordinates; the canvas converts them to logical
//! coordinates through its [`crate::viewport::Viewport`].

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    /// Platform command modifier (Ctrl, or Cmd on macOS).
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer event in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down { position: Point, button: MouseButton },
    Up { position: Point, button: MouseButton },
    Move { position: Point },
    Scroll { position: Point, delta: Vec2 },
}

impl PointerEvent {
    pub fn position(&self) -> Point {
        match *self {
            PointerEvent::Down { position, .. }
            | PointerEvent::Up { position, .. }
            | PointerEvent::Move { position }
            | PointerEvent::Scroll { position, .. } => position,
        }
    }
}

/// Key codes the canvas reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Char(char),
}

/// Keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(Key),
    Released(Key),
}

/// Tracks pointer, button and key state between events.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    /// Pointer position in device coordinates.
    pub pointer_position: Point,
    pub previous_pointer_position: Point,
    pressed_buttons: HashSet<MouseButton>,
    pub modifiers: Modifiers,
    pressed_keys: HashSet<Key>,
    /// Device position where the left button went down.
    pub drag_start: Option<Point>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        self.previous_pointer_position = self.pointer_position;
        self.pointer_position = event.position();
        match event {
            PointerEvent::Down { position, button } => {
                self.pressed_buttons.insert(button);
                if button == MouseButton::Left {
                    self.drag_start = Some(position);
                }
            }
            PointerEvent::Up { button, .. } => {
                self.pressed_buttons.remove(&button);
                if button == MouseButton::Left {
                    self.drag_start = None;
                }
            }
            PointerEvent::Move { .. } | PointerEvent::Scroll { .. } => {}
        }
    }

    pub fn handle_key_event(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Pressed(key) => {
                self.pressed_keys.insert(key);
            }
            KeyEvent::Released(key) => {
                self.pressed_keys.remove(&key);
            }
        }
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.pressed_buttons.contains(&button)
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_start.is_some()
    }

    /// Pointer movement since the previous event.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_position - self.previous_pointer_position
    }

    /// Pointer movement since the left button went down.
    pub fn drag_delta(&self) -> Option<Vec2> {
        self.drag_start.map(|start| self.pointer_position - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_press_and_release() {
        let mut input = InputState::new();
        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        assert!(input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_button_pressed(MouseButton::Right));

        input.handle_pointer_event(PointerEvent::Up {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        assert!(!input.is_button_pressed(MouseButton::Left));
        assert!(!input.is_dragging());
    }

    #[test]
    fn test_drag_tracking() {
        let mut input = InputState::new();
        input.handle_pointer_event(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: MouseButton::Left,
        });
        input.handle_pointer_event(PointerEvent::Move {
            position: Point::new(150.0, 120.0),
        });

        let delta = input.drag_delta().unwrap();
        assert!((delta.x - 50.0).abs() < f64::EPSILON);
        assert!((delta.y - 20.0).abs() < f64::EPSILON);
        assert_eq!(input.pointer_delta(), Vec2::new(50.0, 20.0));
    }

    #[test]
    fn test_keys_and_modifiers() {
        let mut input = InputState::new();
        input.handle_key_event(KeyEvent::Pressed(Key::Char('z')));
        assert!(input.is_key_pressed(Key::Char('z')));
        input.handle_key_event(KeyEvent::Released(Key::Char('z')));
        assert!(!input.is_key_pressed(Key::Char('z')));

        input.set_modifiers(Modifiers::ctrl());
        assert!(input.modifiers.command());
        assert!(!Modifiers::shift().command());
    }
}
