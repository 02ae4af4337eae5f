// src/display/caps.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Number of mouse buttons reported by the backend.
pub const NUM_BUTTONS: usize = 3;

/// Size in bytes of a native cursor handle.
pub const CURSOR_HANDLE_SIZE: usize = 8;

/// Number of slots in the key-down buffer, one per key code.
pub const KEYBOARD_SIZE: usize = 256;

bitflags! {
    /// What the native cursor implementation can display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct CursorCapabilities: u32 {
        /// Fully transparent or fully opaque pixels.
        const ONE_BIT_TRANSPARENCY = 1 << 0;
        /// Per-pixel 8-bit alpha.
        const EIGHT_BIT_ALPHA = 1 << 1;
        /// Multi-image cursors cycling with per-image delays.
        const ANIMATION = 1 << 2;
    }
}

bitflags! {
    /// Off-screen rendering support.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PbufferCapabilities: u32 {
        const PBUFFER_SUPPORTED = 1 << 0;
        const RENDER_TEXTURE_SUPPORTED = 1 << 1;
        const RENDER_TEXTURE_RECTANGLE_SUPPORTED = 1 << 2;
    }
}
