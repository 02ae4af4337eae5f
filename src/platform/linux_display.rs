// src/platform/linux_display.rs
//
// Linux display backend. Every operation that reaches native code runs
// inside the toolkit lock; resource creation additionally takes a display
// usage and, for GL peers, a library reference, and unwinds whatever it
// took if a later step fails.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use log::*;
use x11::xlib;

use crate::config::CONFIG;
use crate::display::{
    CursorCapabilities, CursorHandle, CursorImage, DisplayImplementation, DisplayMode, DisplayPeer,
    KeyEvent, KeyState, MouseEvent, MouseState, PbufferCapabilities, PbufferPeer, PixelFormat,
    KEYBOARD_SIZE, NUM_BUTTONS,
};
use crate::error::{DisplayError, Result};
use crate::platform::backends::x11::XlibBindings;
use crate::platform::bindings::NativeBindings;
use crate::platform::library::{GlLibrary, GlxLoader, SharedGlx};
use crate::platform::lock::{ProcessLock, ToolkitGuard, ToolkitLock, XDisplayLock};
use crate::platform::usage::DisplayUsage;

/// Everything the toolkit lock protects.
struct Backend<B, L> {
    bindings: B,
    library: L,
    usage: DisplayUsage,
}

impl<B: NativeBindings, L: GlLibrary> Backend<B, L> {
    fn inc_display(&mut self) -> Result<()> {
        let bindings = &mut self.bindings;
        self.usage.acquire(|| bindings.open_display())
    }

    fn dec_display(&mut self) {
        let bindings = &mut self.bindings;
        self.usage.release(|| bindings.close_display());
    }

    fn unload_library(&mut self) {
        self.library.unload();
    }

    /// Runs `query` with the display connection held open for its duration.
    fn with_display<R>(&mut self, query: impl FnOnce(&mut B) -> Result<R>) -> Result<R> {
        self.inc_display()?;
        let mut counted = Rollback::new(self, Self::dec_display);
        query(&mut counted.bindings)
    }

    /// Display usage, then GL library, then `construct`. A failure at any
    /// step undoes the steps before it and returns the original error.
    fn acquire_gl_peer<P>(&mut self, construct: impl FnOnce(&mut B) -> Result<P>) -> Result<P> {
        self.inc_display()?;
        let mut counted = Rollback::new(self, Self::dec_display);
        counted.library.load()?;
        let mut loaded = Rollback::new(&mut *counted, Self::unload_library);
        let peer = construct(&mut loaded.bindings)?;
        loaded.commit();
        counted.commit();
        Ok(peer)
    }
}

/// Undoes one acquisition step when dropped, unless committed first.
struct Rollback<'a, T, F: FnOnce(&mut T)> {
    target: &'a mut T,
    undo: Option<F>,
}

impl<'a, T, F: FnOnce(&mut T)> Rollback<'a, T, F> {
    fn new(target: &'a mut T, undo: F) -> Self {
        Self {
            target,
            undo: Some(undo),
        }
    }

    fn commit(mut self) {
        self.undo = None;
    }
}

impl<T, F: FnOnce(&mut T)> Deref for Rollback<'_, T, F> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.target
    }
}

impl<T, F: FnOnce(&mut T)> DerefMut for Rollback<'_, T, F> {
    fn deref_mut(&mut self) -> &mut T {
        &mut *self.target
    }
}

impl<T, F: FnOnce(&mut T)> Drop for Rollback<'_, T, F> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            undo(&mut *self.target);
        }
    }
}

/// The Linux/X11 implementation of [`DisplayImplementation`].
///
/// `B` performs the native calls and `L` loads the GL library; both are
/// injected so the locking and rollback rules can be exercised against test
/// doubles.
pub struct LinuxDisplay<B, L> {
    lock: Arc<dyn ToolkitLock>,
    state: Mutex<Backend<B, L>>,
}

impl LinuxDisplay<XlibBindings, GlxLoader> {
    /// Builds the native backend from [`CONFIG`], serialized by the
    /// process lock.
    pub fn from_config() -> Self {
        let (bindings, loader) = Self::native_parts();
        LinuxDisplay::new(bindings, loader)
    }

    /// Builds the native backend serialized with another toolkit through
    /// `XLockDisplay` on that toolkit's connection.
    ///
    /// # Safety
    ///
    /// Same contract as [`XDisplayLock::new`].
    pub unsafe fn sharing_display(display: *mut xlib::Display) -> Self {
        let (bindings, loader) = Self::native_parts();
        LinuxDisplay::with_lock(bindings, loader, Arc::new(XDisplayLock::new(display)))
    }

    fn native_parts() -> (XlibBindings, GlxLoader) {
        let glx = SharedGlx::new();
        let bindings = XlibBindings::new(CONFIG.display.name.clone(), glx.clone(), &CONFIG.input);
        (bindings, GlxLoader::new(glx))
    }
}

impl<B: NativeBindings, L: GlLibrary> LinuxDisplay<B, L> {
    /// A backend serialized by the process-wide [`ProcessLock`].
    pub fn new(bindings: B, library: L) -> Self {
        Self::with_lock(bindings, library, ProcessLock::global())
    }

    pub fn with_lock(bindings: B, library: L, lock: Arc<dyn ToolkitLock>) -> Self {
        Self {
            lock,
            state: Mutex::new(Backend {
                bindings,
                library,
                usage: DisplayUsage::new(),
            }),
        }
    }

    /// Current display usage count.
    pub fn display_usage(&self) -> usize {
        self.critical("display_usage", |backend| backend.usage.count())
    }

    /// Runs `f` with the toolkit lock held.
    ///
    /// The state mutex is only ever taken under the toolkit lock, so it is
    /// uncontended; poisoning from a panicking native call is cleared.
    fn critical<R>(&self, op: &'static str, f: impl FnOnce(&mut Backend<B, L>) -> R) -> R {
        let _guard = ToolkitGuard::acquire(self.lock.as_ref());
        trace!("{}: toolkit lock acquired", op);
        let mut backend = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut backend)
    }

    fn unsupported(op: &'static str) -> Result<()> {
        debug!("{} requested; not supported on Linux.", op);
        Err(DisplayError::Unsupported(op))
    }
}

impl<B: NativeBindings, L: GlLibrary> DisplayImplementation for LinuxDisplay<B, L> {
    fn create_window(
        &self,
        peer: &DisplayPeer,
        mode: &DisplayMode,
        fullscreen: bool,
        x: i32,
        y: i32,
    ) -> Result<()> {
        self.critical("create_window", |b| {
            b.bindings
                .create_window(peer.handle(), mode, fullscreen, x, y)
                .inspect_err(|e| error!("Window creation failed: {}", e))
        })
    }

    fn destroy_window(&self) {
        self.critical("destroy_window", |b| b.bindings.destroy_window())
    }

    fn set_title(&self, title: &str) {
        self.critical("set_title", |b| b.bindings.set_title(title))
    }

    fn is_close_requested(&self) -> bool {
        self.critical("is_close_requested", |b| b.bindings.is_close_requested())
    }

    fn is_visible(&self) -> bool {
        self.critical("is_visible", |b| b.bindings.is_visible())
    }

    fn is_active(&self) -> bool {
        self.critical("is_active", |b| b.bindings.is_active())
    }

    fn is_dirty(&self) -> bool {
        self.critical("is_dirty", |b| b.bindings.is_dirty())
    }

    fn update(&self) {
        self.critical("update", |b| b.bindings.update())
    }

    fn reshape(&self, x: i32, y: i32, width: u32, height: u32) {
        self.critical("reshape", |b| b.bindings.reshape(x, y, width, height))
    }

    fn init(&self) -> Result<DisplayMode> {
        self.critical("init", |b| -> Result<DisplayMode> {
            let mode = b.with_display(|bindings| bindings.init())?;
            info!("Desktop display mode: {}", mode);
            Ok(mode)
        })
    }

    fn switch_display_mode(&self, mode: &DisplayMode) -> Result<()> {
        self.critical("switch_display_mode", |b| {
            b.bindings.switch_display_mode(mode)
        })
    }

    fn reset_display_mode(&self) {
        self.critical("reset_display_mode", |b| b.bindings.reset_display_mode())
    }

    fn get_available_display_modes(&self) -> Result<Vec<DisplayMode>> {
        self.critical("get_available_display_modes", |b| {
            b.with_display(|bindings| bindings.get_available_display_modes())
        })
    }

    fn get_gamma_ramp_length(&self) -> Result<usize> {
        self.critical("get_gamma_ramp_length", |b| {
            b.with_display(|bindings| Ok(bindings.get_gamma_ramp_length()))
        })
    }

    fn set_gamma_ramp(&self, ramp: &[f32]) -> Result<()> {
        self.critical("set_gamma_ramp", |b| b.bindings.set_gamma_ramp(ramp))
    }

    fn get_adapter(&self) -> Option<String> {
        None
    }

    fn get_version(&self) -> Option<String> {
        None
    }

    fn create_peer_info(&self, pixel_format: &PixelFormat) -> Result<DisplayPeer> {
        self.critical("create_peer_info", |b| -> Result<DisplayPeer> {
            let handle = b
                .acquire_gl_peer(|bindings| bindings.create_display_peer(pixel_format))
                .inspect_err(|e| error!("Display peer creation failed: {}", e))?;
            info!("Display peer {:?} created for {:?}", handle, pixel_format);
            Ok(DisplayPeer::new(handle, *pixel_format))
        })
    }

    fn destroy_peer_info(&self, peer: DisplayPeer) {
        self.critical("destroy_peer_info", |b| {
            let handle = peer.release();
            b.bindings.destroy_display_peer(handle);
            b.library.unload();
            b.dec_display();
            info!("Display peer {:?} destroyed.", handle);
        })
    }

    fn get_pbuffer_capabilities(&self) -> Result<PbufferCapabilities> {
        self.critical("get_pbuffer_capabilities", |b| -> Result<PbufferCapabilities> {
            b.inc_display()?;
            let mut counted = Rollback::new(b, Backend::<B, L>::dec_display);
            if let Err(e) = counted.library.load() {
                warn!("No pbuffer support without the OpenGL library: {}", e);
                return Ok(PbufferCapabilities::empty());
            }
            let mut loaded = Rollback::new(&mut *counted, Backend::<B, L>::unload_library);
            let caps = loaded.bindings.pbuffer_capabilities();
            Ok(caps)
        })
    }

    fn create_pbuffer(&self, width: u32, height: u32, pixel_format: &PixelFormat) -> Result<PbufferPeer> {
        self.critical("create_pbuffer", |b| -> Result<PbufferPeer> {
            let handle = b
                .acquire_gl_peer(|bindings| bindings.create_pbuffer(width, height, pixel_format))
                .inspect_err(|e| error!("Pbuffer creation failed: {}", e))?;
            info!("Pbuffer {:?} created ({}x{})", handle, width, height);
            Ok(PbufferPeer::new(handle, width, height, *pixel_format))
        })
    }

    fn destroy_pbuffer(&self, peer: PbufferPeer) {
        self.critical("destroy_pbuffer", |b| {
            let handle = peer.release();
            b.bindings.destroy_pbuffer(handle);
            b.library.unload();
            b.dec_display();
            info!("Pbuffer {:?} destroyed.", handle);
        })
    }

    fn is_buffer_lost(&self, _peer: &PbufferPeer) -> bool {
        false
    }

    fn set_pbuffer_attrib(&self, _peer: &PbufferPeer, _attrib: i32, _value: i32) -> Result<()> {
        Self::unsupported("set_pbuffer_attrib")
    }

    fn bind_tex_image_to_pbuffer(&self, _peer: &PbufferPeer, _buffer: i32) -> Result<()> {
        Self::unsupported("bind_tex_image_to_pbuffer")
    }

    fn release_tex_image_from_pbuffer(&self, _peer: &PbufferPeer, _buffer: i32) -> Result<()> {
        Self::unsupported("release_tex_image_from_pbuffer")
    }

    fn has_wheel(&self) -> bool {
        true
    }

    fn get_button_count(&self) -> usize {
        NUM_BUTTONS
    }

    fn create_mouse(&self) {
        self.critical("create_mouse", |b| b.bindings.create_mouse())
    }

    fn destroy_mouse(&self) {
        self.critical("destroy_mouse", |b| b.bindings.destroy_mouse())
    }

    fn poll_mouse(&self, state: &mut MouseState) {
        self.critical("poll_mouse", |b| b.bindings.poll_mouse(state))
    }

    fn read_mouse(&self, buffer: &mut [MouseEvent]) -> usize {
        self.critical("read_mouse", |b| b.bindings.read_mouse(buffer))
    }

    fn grab_mouse(&self, grab: bool) {
        self.critical("grab_mouse", |b| b.bindings.grab_mouse(grab))
    }

    fn get_native_cursor_capabilities(&self) -> Result<CursorCapabilities> {
        self.critical("get_native_cursor_capabilities", |b| {
            b.with_display(|bindings| bindings.native_cursor_capabilities())
        })
    }

    fn set_native_cursor(&self, cursor: Option<&CursorHandle>) -> Result<()> {
        self.critical("set_native_cursor", |b| b.bindings.set_native_cursor(cursor))
    }

    fn get_min_cursor_size(&self) -> Result<u32> {
        self.critical("get_min_cursor_size", |b| {
            b.with_display(|bindings| Ok(bindings.min_cursor_size()))
        })
    }

    fn get_max_cursor_size(&self) -> Result<u32> {
        self.critical("get_max_cursor_size", |b| {
            b.with_display(|bindings| Ok(bindings.max_cursor_size()))
        })
    }

    fn create_cursor(&self, image: &CursorImage<'_>) -> Result<CursorHandle> {
        image.validate()?;
        self.critical("create_cursor", |b| -> Result<CursorHandle> {
            b.inc_display()?;
            let mut counted = Rollback::new(b, Backend::<B, L>::dec_display);
            let mut handle = CursorHandle::zeroed();
            counted
                .bindings
                .create_cursor(&mut handle, image)
                .inspect_err(|e| error!("Cursor creation failed: {}", e))?;
            counted.commit();
            info!(
                "Native cursor {:#x} created ({}x{}, {} images)",
                handle.id(),
                image.width,
                image.height,
                image.num_images
            );
            Ok(handle)
        })
    }

    fn destroy_cursor(&self, cursor: CursorHandle) {
        self.critical("destroy_cursor", |b| {
            b.bindings.destroy_cursor(&cursor);
            b.dec_display();
            debug!("Native cursor {:#x} destroyed.", cursor.id());
        })
    }

    fn create_keyboard(&self) -> Result<()> {
        self.critical("create_keyboard", |b| b.bindings.create_keyboard())
    }

    fn destroy_keyboard(&self) {
        self.critical("destroy_keyboard", |b| b.bindings.destroy_keyboard())
    }

    fn poll_keyboard(&self, keys: &mut [u8; KEYBOARD_SIZE]) {
        self.critical("poll_keyboard", |b| b.bindings.poll_keyboard(keys))
    }

    fn read_keyboard(&self, buffer: &mut [KeyEvent]) -> usize {
        self.critical("read_keyboard", |b| b.bindings.read_keyboard(buffer))
    }

    fn is_state_key_set(&self, _key: u8) -> KeyState {
        KeyState::Unknown
    }
}

#[cfg(test)]
mod tests;
