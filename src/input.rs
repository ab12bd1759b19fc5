//! Keyboard state
//!
//! Key presses are not acted on when they arrive. The app only records which
//! logical keys are held, and the scene consumes that set once per frame.

use std::collections::HashSet;

use winit::{
    event::{ElementState, KeyEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Keys the viewer reacts to while they are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerKey {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
    CantLeft,
    CantRight,
    TiltUp,
    TiltDown,
    PanLeft,
    PanRight,
    Align,
    ObjectForward,
    ObjectBackward,
    ObjectLeft,
    ObjectRight,
    ObjectDown,
    ObjectUp,
}

impl ViewerKey {
    pub fn from_key_code(code: KeyCode) -> Option<Self> {
        let key = match code {
            KeyCode::KeyW => ViewerKey::Forward,
            KeyCode::KeyS => ViewerKey::Backward,
            KeyCode::KeyA => ViewerKey::Left,
            KeyCode::KeyD => ViewerKey::Right,
            KeyCode::Space => ViewerKey::Up,
            KeyCode::ShiftLeft | KeyCode::ShiftRight => ViewerKey::Down,
            KeyCode::Digit7 | KeyCode::Numpad7 => ViewerKey::CantLeft,
            KeyCode::Digit9 | KeyCode::Numpad9 => ViewerKey::CantRight,
            KeyCode::Digit1 | KeyCode::Numpad1 => ViewerKey::TiltUp,
            KeyCode::Digit3 | KeyCode::Numpad3 => ViewerKey::TiltDown,
            KeyCode::Digit4 | KeyCode::Numpad4 => ViewerKey::PanLeft,
            KeyCode::Digit6 | KeyCode::Numpad6 => ViewerKey::PanRight,
            KeyCode::KeyR => ViewerKey::Align,
            KeyCode::ArrowUp => ViewerKey::ObjectForward,
            KeyCode::ArrowDown => ViewerKey::ObjectBackward,
            KeyCode::ArrowLeft => ViewerKey::ObjectLeft,
            KeyCode::ArrowRight => ViewerKey::ObjectRight,
            KeyCode::KeyQ => ViewerKey::ObjectUp,
            KeyCode::KeyE => ViewerKey::ObjectDown,
            _ => return None,
        };
        Some(key)
    }
}

/// The set of currently held [`ViewerKey`]s.
#[derive(Debug, Default, Clone)]
pub struct HeldKeys {
    held: HashSet<ViewerKey>,
}

impl HeldKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_keyboard_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(code) = event.physical_key {
            if let Some(key) = ViewerKey::from_key_code(code) {
                self.set(key, event.state == ElementState::Pressed);
            }
        }
    }

    pub fn set(&mut self, key: ViewerKey, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_held(&self, key: ViewerKey) -> bool {
        self.held.contains(&key)
    }

    /// Forgets every key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(ViewerKey::from_key_code(KeyCode::KeyW), Some(ViewerKey::Forward));
        assert_eq!(ViewerKey::from_key_code(KeyCode::Numpad4), Some(ViewerKey::PanLeft));
        assert_eq!(ViewerKey::from_key_code(KeyCode::ShiftRight), Some(ViewerKey::Down));
        assert_eq!(ViewerKey::from_key_code(KeyCode::KeyQ), Some(ViewerKey::ObjectUp));
        assert_eq!(ViewerKey::from_key_code(KeyCode::KeyE), Some(ViewerKey::ObjectDown));
        assert_eq!(ViewerKey::from_key_code(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_press_and_release() {
        let mut keys = HeldKeys::new();
        keys.set(ViewerKey::Forward, true);
        keys.set(ViewerKey::Forward, true);
        assert!(keys.is_held(ViewerKey::Forward));
        keys.set(ViewerKey::Forward, false);
        assert!(keys.is_empty());
    }
}
