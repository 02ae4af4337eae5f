// src/display/implementation.rs
//! DisplayImplementation trait - the capability set a platform backend offers
//! to the platform-neutral display, mouse and keyboard layers.
//!
//! ## Threading Model
//! - Every method takes `&self`; implementations serialize internally.
//! - Methods that reach native code hold the platform's global lock for their
//!   whole duration. Calling back into the backend from inside a native call
//!   is not supported.
//!
//! ## Resource ownership
//! - `create_peer_info`, `create_pbuffer` and `create_cursor` return owned
//!   values. The caller hands each back to the matching `destroy_*` method,
//!   which consumes it.

use super::caps::{CursorCapabilities, PbufferCapabilities, KEYBOARD_SIZE};
use super::input::{KeyEvent, KeyState, MouseEvent, MouseState};
use super::mode::DisplayMode;
use super::peer::{CursorHandle, CursorImage, DisplayPeer, PbufferPeer};
use super::pixel_format::PixelFormat;
use crate::error::Result;

/// Platform display backend.
pub trait DisplayImplementation {
    // --- Window ---

    /// Creates the window for `peer` at (`x`, `y`) with the size of `mode`.
    fn create_window(
        &self,
        peer: &DisplayPeer,
        mode: &DisplayMode,
        fullscreen: bool,
        x: i32,
        y: i32,
    ) -> Result<()>;

    fn destroy_window(&self);

    fn set_title(&self, title: &str);

    /// Returns and clears the pending close request.
    fn is_close_requested(&self) -> bool;

    fn is_visible(&self) -> bool;

    fn is_active(&self) -> bool;

    /// Returns and clears the "needs repaint" flag.
    fn is_dirty(&self) -> bool;

    /// Pumps native events, updating window flags and input state.
    fn update(&self);

    fn reshape(&self, x: i32, y: i32, width: u32, height: u32);

    // --- Display modes and gamma ---

    /// Prepares the backend and returns the current desktop mode.
    fn init(&self) -> Result<DisplayMode>;

    fn switch_display_mode(&self, mode: &DisplayMode) -> Result<()>;

    /// Restores the desktop mode recorded by `init`.
    fn reset_display_mode(&self);

    fn get_available_display_modes(&self) -> Result<Vec<DisplayMode>>;

    /// Number of entries per channel the gamma ramp expects.
    fn get_gamma_ramp_length(&self) -> Result<usize>;

    /// Applies a ramp of values in [0, 1], used for all three channels.
    fn set_gamma_ramp(&self, ramp: &[f32]) -> Result<()>;

    fn get_adapter(&self) -> Option<String>;

    fn get_version(&self) -> Option<String>;

    // --- GL peers ---

    fn create_peer_info(&self, pixel_format: &PixelFormat) -> Result<DisplayPeer>;

    fn destroy_peer_info(&self, peer: DisplayPeer);

    fn get_pbuffer_capabilities(&self) -> Result<PbufferCapabilities>;

    fn create_pbuffer(&self, width: u32, height: u32, pixel_format: &PixelFormat) -> Result<PbufferPeer>;

    fn destroy_pbuffer(&self, peer: PbufferPeer);

    fn is_buffer_lost(&self, peer: &PbufferPeer) -> bool;

    fn set_pbuffer_attrib(&self, peer: &PbufferPeer, attrib: i32, value: i32) -> Result<()>;

    fn bind_tex_image_to_pbuffer(&self, peer: &PbufferPeer, buffer: i32) -> Result<()>;

    fn release_tex_image_from_pbuffer(&self, peer: &PbufferPeer, buffer: i32) -> Result<()>;

    // --- Mouse ---

    fn has_wheel(&self) -> bool;

    fn get_button_count(&self) -> usize;

    fn create_mouse(&self);

    fn destroy_mouse(&self);

    /// Fills `state` with motion since the last poll and the button states.
    fn poll_mouse(&self, state: &mut MouseState);

    /// Moves up to `buffer.len()` queued events into `buffer`, returning the count.
    fn read_mouse(&self, buffer: &mut [MouseEvent]) -> usize;

    fn grab_mouse(&self, grab: bool);

    // --- Cursor ---

    fn get_native_cursor_capabilities(&self) -> Result<CursorCapabilities>;

    /// Shows `cursor`, or the default cursor for `None`.
    fn set_native_cursor(&self, cursor: Option<&CursorHandle>) -> Result<()>;

    fn get_min_cursor_size(&self) -> Result<u32>;

    fn get_max_cursor_size(&self) -> Result<u32>;

    fn create_cursor(&self, image: &CursorImage<'_>) -> Result<CursorHandle>;

    fn destroy_cursor(&self, cursor: CursorHandle);

    // --- Keyboard ---

    fn create_keyboard(&self) -> Result<()>;

    fn destroy_keyboard(&self);

    /// Fills `keys` with 1 for every key currently held down, 0 otherwise.
    fn poll_keyboard(&self, keys: &mut [u8; KEYBOARD_SIZE]);

    fn read_keyboard(&self, buffer: &mut [KeyEvent]) -> usize;

    fn is_state_key_set(&self, key: u8) -> KeyState;
}
