// src/platform/bindings.rs
//
// Defines the `NativeBindings` trait: the native operations the display
// backend delegates to. One method per native call; the backend wraps each in
// the toolkit lock and handles display usage and library loading itself.

use crate::display::{
    CursorCapabilities, CursorHandle, CursorImage, DisplayMode, KeyEvent, MouseEvent, MouseState,
    PbufferCapabilities, PeerHandle, PixelFormat, KEYBOARD_SIZE,
};
use crate::error::Result;

/// The native side of the display backend.
///
/// Implementations may assume that every call happens with the toolkit lock
/// held, that `open_display` and `close_display` alternate, and that peer and
/// cursor calls only happen while the display is open.
pub trait NativeBindings: Send {
    // --- Connection ---

    fn open_display(&mut self) -> Result<()>;
    fn close_display(&mut self);

    // --- Peers ---

    fn create_display_peer(&mut self, pixel_format: &PixelFormat) -> Result<PeerHandle>;
    fn destroy_display_peer(&mut self, peer: PeerHandle);
    fn create_pbuffer(&mut self, width: u32, height: u32, pixel_format: &PixelFormat) -> Result<PeerHandle>;
    fn destroy_pbuffer(&mut self, peer: PeerHandle);
    fn pbuffer_capabilities(&mut self) -> PbufferCapabilities;

    // --- Window ---

    fn create_window(&mut self, peer: PeerHandle, mode: &DisplayMode, fullscreen: bool, x: i32, y: i32) -> Result<()>;
    fn destroy_window(&mut self);
    fn set_title(&mut self, title: &str);
    fn is_close_requested(&mut self) -> bool;
    fn is_visible(&mut self) -> bool;
    fn is_active(&mut self) -> bool;
    fn is_dirty(&mut self) -> bool;
    fn update(&mut self);
    fn reshape(&mut self, x: i32, y: i32, width: u32, height: u32);

    // --- Modes and gamma ---

    fn init(&mut self) -> Result<DisplayMode>;
    fn switch_display_mode(&mut self, mode: &DisplayMode) -> Result<()>;
    fn reset_display_mode(&mut self);
    fn get_available_display_modes(&mut self) -> Result<Vec<DisplayMode>>;
    fn get_gamma_ramp_length(&mut self) -> usize;
    fn set_gamma_ramp(&mut self, ramp: &[f32]) -> Result<()>;

    // --- Mouse ---

    fn create_mouse(&mut self);
    fn destroy_mouse(&mut self);
    fn poll_mouse(&mut self, state: &mut MouseState);
    fn read_mouse(&mut self, buffer: &mut [MouseEvent]) -> usize;
    fn grab_mouse(&mut self, grab: bool);

    // --- Cursor ---

    fn native_cursor_capabilities(&mut self) -> Result<CursorCapabilities>;
    fn set_native_cursor(&mut self, cursor: Option<&CursorHandle>) -> Result<()>;
    fn min_cursor_size(&mut self) -> u32;
    fn max_cursor_size(&mut self) -> u32;
    /// Builds a cursor from `image` and writes its native id into `handle`.
    fn create_cursor(&mut self, handle: &mut CursorHandle, image: &CursorImage<'_>) -> Result<()>;
    fn destroy_cursor(&mut self, handle: &CursorHandle);

    // --- Keyboard ---

    fn create_keyboard(&mut self) -> Result<()>;
    fn destroy_keyboard(&mut self);
    fn poll_keyboard(&mut self, keys: &mut [u8; KEYBOARD_SIZE]);
    fn read_keyboard(&mut self, buffer: &mut [KeyEvent]) -> usize;
}
