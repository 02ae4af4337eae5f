// src/display/input.rs

use super::caps::NUM_BUTTONS;
use serde::{Deserialize, Serialize};

/// Snapshot returned by a mouse poll: motion accumulated since the previous
/// poll plus the current button states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseState {
    pub dx: i32,
    pub dy: i32,
    pub dwheel: i32,
    pub buttons: [bool; NUM_BUTTONS],
}

/// One buffered mouse event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MouseEvent {
    /// Button index that changed, `None` for pure motion/wheel events.
    pub button: Option<u8>,
    /// New state of `button`; meaningless when `button` is `None`.
    pub pressed: bool,
    pub dx: i32,
    pub dy: i32,
    pub dwheel: i32,
}

/// One buffered keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Backend key code, see [`crate::keys`].
    pub key: u8,
    pub pressed: bool,
    /// Text produced by the key press, if any.
    pub character: Option<char>,
}

/// State of a toggle key such as Caps Lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyState {
    On,
    Off,
    Unknown,
}
