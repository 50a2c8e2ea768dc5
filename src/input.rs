use std::collections::{HashSet, VecDeque};

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

impl KeyCode {
    /// Parses key names as written in scene files (`"W"`, `"Escape"`, `"Up"`).
    pub fn from_name(name: &str) -> Option<Self> {
        if let Some(key) = parse_named_key(name) {
            return Some(key);
        }
        let mut chars = name.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return None;
        };
        if ch.is_ascii_alphabetic() {
            return Some(Self::Character(ch.to_ascii_uppercase()));
        }
        if ch.is_ascii_digit() {
            return Some(Self::Digit(ch as u8 - b'0'));
        }
        None
    }
}

fn parse_named_key(name: &str) -> Option<KeyCode> {
    use NamedKey::*;
    let key = match name {
        "Space" => Space,
        "Enter" | "Return" => Enter,
        "Tab" => Tab,
        "Left" => Left,
        "Right" => Right,
        "Up" => Up,
        "Down" => Down,
        "Escape" | "Esc" => Escape,
        "LeftShift" | "LShift" => LeftShift,
        "RightShift" | "RShift" => RightShift,
        "LeftCtrl" | "LControl" => LeftCtrl,
        "RightCtrl" | "RControl" => RightCtrl,
        _ => return None,
    };
    Some(KeyCode::Named(key))
}

/// Keys without a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Escape,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
}

/// Set of keys currently held down.
#[derive(Debug, Default, Clone)]
pub struct InputState {
    keys: HashSet<KeyCode>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&mut self, key: KeyCode) {
        self.keys.insert(key);
    }

    pub fn set_key_up(&mut self, key: KeyCode) {
        self.keys.remove(&key);
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    /// Forgets every held key, used when the window loses focus.
    pub fn release_all(&mut self) {
        self.keys.clear();
    }
}

/// Window-system input recorded between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPressed(KeyCode),
    KeyReleased(KeyCode),
    /// Absolute cursor sample in window pixels.
    CursorMoved(Vec2),
    /// Relative pointer motion, delivered while the cursor is locked.
    MouseMotion(Vec2),
    Scroll(f32),
    Resized { width: u32, height: u32 },
    FocusLost,
    CloseRequested,
}

/// FIFO of input events, drained once per frame in arrival order.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = InputEvent> + '_ {
        self.events.drain(..)
    }
}

/// Turns absolute cursor samples into look offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseTracker {
    last: Vec2,
    first_sample: bool,
}

impl MouseTracker {
    /// Starts tracking from the given position, usually the window centre.
    pub fn new(initial: Vec2) -> Self {
        Self {
            last: initial,
            first_sample: true,
        }
    }

    /// Returns `(xoffset, yoffset)` with y reversed so that moving the mouse up
    /// looks up. The first sample only seeds the last position.
    pub fn offset(&mut self, position: Vec2) -> Vec2 {
        if self.first_sample {
            self.last = position;
            self.first_sample = false;
        }
        let offset = Vec2::new(position.x - self.last.x, self.last.y - position.y);
        self.last = position;
        offset
    }

    pub fn last_position(&self) -> Vec2 {
        self.last
    }
}
