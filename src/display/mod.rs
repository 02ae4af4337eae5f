// src/display/mod.rs
//! Platform-neutral display vocabulary.
//!
//! - DisplayImplementation: the capability set a platform backend provides
//! - Value types shared by the backend and its native bindings

pub mod caps;
pub mod implementation;
pub mod input;
pub mod mode;
pub mod peer;
pub mod pixel_format;

pub use caps::{
    CursorCapabilities, PbufferCapabilities, CURSOR_HANDLE_SIZE, KEYBOARD_SIZE, NUM_BUTTONS,
};
pub use implementation::DisplayImplementation;
pub use input::{KeyEvent, KeyState, MouseEvent, MouseState};
pub use mode::DisplayMode;
pub use peer::{CursorHandle, CursorImage, DisplayPeer, PbufferPeer, PeerHandle};
pub use pixel_format::PixelFormat;
