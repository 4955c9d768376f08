//! Keyboard input tracking.
//!
//! Key events arrive asynchronously from the platform and write straight into
//! a shared `InputState` (last writer wins). The frame loop only ever reads a
//! copied snapshot, so nothing it does can observe a half-applied event.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// The closed set of keys the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Forward,
    Back,
    Left,
    Right,
    Interact,
    Reset,
    Jump,
}

impl Key {
    pub const ALL: [Key; 7] = [
        Key::Forward,
        Key::Back,
        Key::Left,
        Key::Right,
        Key::Interact,
        Key::Reset,
        Key::Jump,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Maps a physical key code (as reported by the browser/windowing layer)
    /// to a game key. Unrecognized codes map to `None`.
    pub fn from_code(code: &str) -> Option<Key> {
        let key = match code.to_ascii_lowercase().as_str() {
            "w" | "arrowup" => Key::Forward,
            "s" | "arrowdown" => Key::Back,
            "a" | "arrowleft" => Key::Left,
            "d" | "arrowright" => Key::Right,
            "e" => Key::Interact,
            "r" => Key::Reset,
            " " | "space" => Key::Jump,
            _ => return None,
        };
        Some(key)
    }
}

/// Held/released state for every `Key`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    held: [bool; Key::ALL.len()],
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held[key.index()]
    }

    pub fn set(&mut self, key: Key, held: bool) {
        self.held[key.index()] = held;
    }

    /// True if `key` is held now but was not held in `previous`.
    pub fn pressed_since(&self, previous: &InputState, key: Key) -> bool {
        self.is_held(key) && !previous.is_held(key)
    }

    pub fn any_held(&self) -> bool {
        self.held.iter().any(|held| *held)
    }
}

/// Cloneable handle shared between key event callbacks and the frame loop.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    inner: Arc<Mutex<InputState>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles a key-down event. Returns the mapped key, if any.
    pub fn key_down(&self, code: &str) -> Option<Key> {
        self.apply(code, true)
    }

    /// Handles a key-up event. Returns the mapped key, if any.
    pub fn key_up(&self, code: &str) -> Option<Key> {
        self.apply(code, false)
    }

    fn apply(&self, code: &str, held: bool) -> Option<Key> {
        let Some(key) = Key::from_code(code) else {
            tracing::trace!(code, "ignoring unmapped key");
            return None;
        };
        self.set(key, held);
        Some(key)
    }

    /// Sets a key directly, bypassing code mapping.
    pub fn set(&self, key: Key, held: bool) {
        self.inner.lock().set(key, held);
    }

    /// Releases every key (e.g. when the window loses focus).
    pub fn release_all(&self) {
        *self.inner.lock() = InputState::default();
    }

    /// Copies the current state for use during one frame.
    pub fn snapshot(&self) -> InputState {
        *self.inner.lock()
    }
}
