// src/platform/backends/x11/mod.rs

//! Xlib/GLX implementation of the native display bindings.
//!
//! `XlibBindings` ties the submodules together:
//! - `connection`: the connection to the X server.
//! - `glx`: GLX visuals and pbuffers for GL peers.
//! - `window`: the GL window and its pointer grab.
//! - `event`: the X event pump feeding window flags and input.
//! - `input`: buffered mouse and keyboard state.
//! - `modes`: XF86VidMode display modes and gamma.
//! - `cursor`: Xcursor native cursors.
//!
//! Every method runs with the toolkit lock held by the caller.

pub mod connection;
pub mod cursor;
pub mod event;
pub mod glx;
pub mod input;
pub mod modes;
pub mod window;

use crate::config::InputConfig;
use crate::display::{
    CursorCapabilities, CursorHandle, CursorImage, DisplayMode, KeyEvent, MouseEvent, MouseState,
    PbufferCapabilities, PeerHandle, PixelFormat, KEYBOARD_SIZE,
};
use crate::error::{DisplayError, Result};
use crate::platform::bindings::NativeBindings;
use crate::platform::library::{LoadedGlx, SharedGlx};
use connection::Connection;
use event::WindowFlags;
use glx::{GlxPbuffer, GlxVisual};
use input::{KeyboardInput, MouseInput};
use log::{debug, info, warn};
use modes::VidMode;
use std::collections::HashMap;
use window::Window;
use x11::xlib;

/// Native side of a peer.
#[derive(Debug)]
enum Peer {
    Display(GlxVisual),
    Pbuffer(GlxPbuffer),
}

pub struct XlibBindings {
    display_name: Option<String>,
    glx: SharedGlx,
    connection: Option<Connection>,
    peers: HashMap<u64, Peer>,
    next_peer: u64,
    window: Option<Window>,
    flags: WindowFlags,
    vid_mode: VidMode,
    mouse: MouseInput,
    keyboard: KeyboardInput,
}

// SAFETY: the raw Xlib pointers inside are only touched with the toolkit
// lock held, which serializes every call across threads.
unsafe impl Send for XlibBindings {}

impl XlibBindings {
    /// `display_name` of `None` uses the DISPLAY environment variable. GLX
    /// entry points are taken from `glx` while the library loader holds a
    /// reference.
    pub fn new(display_name: Option<String>, glx: SharedGlx, input: &InputConfig) -> Self {
        Self {
            display_name,
            glx,
            connection: None,
            peers: HashMap::new(),
            next_peer: 1,
            window: None,
            flags: WindowFlags::default(),
            vid_mode: VidMode::new(),
            mouse: MouseInput::new(input.mouse_event_capacity),
            keyboard: KeyboardInput::new(input.keyboard_event_capacity),
        }
    }

    fn connection(&self) -> Result<&Connection> {
        self.connection
            .as_ref()
            .filter(|conn| conn.is_open())
            .ok_or_else(|| DisplayError::DisplayUnavailable("X display is not open".to_string()))
    }

    fn with_glx<R>(&self, op: &'static str, f: impl FnOnce(&LoadedGlx) -> Result<R>) -> Result<R> {
        let slot = self.glx.lock();
        let glx = slot
            .as_ref()
            .ok_or_else(|| DisplayError::LibraryLoad(format!("{}: OpenGL library not loaded", op)))?;
        f(glx)
    }

    fn insert_peer(&mut self, peer: Peer) -> PeerHandle {
        let raw = self.next_peer;
        self.next_peer += 1;
        self.peers.insert(raw, peer);
        PeerHandle::new(raw)
    }

    fn visual(&self, handle: PeerHandle) -> Result<&GlxVisual> {
        match self.peers.get(&handle.raw()) {
            Some(Peer::Display(visual)) => Ok(visual),
            Some(Peer::Pbuffer(_)) => Err(DisplayError::InvalidArgument(format!(
                "{:?} is a pbuffer, not a display peer",
                handle
            ))),
            None => Err(DisplayError::InvalidArgument(format!("unknown peer {:?}", handle))),
        }
    }

    fn destroy_window_now(&mut self) {
        if let Some(mut window) = self.window.take() {
            match self.connection.as_ref() {
                Some(conn) => window.cleanup(conn),
                None => warn!("Window {} outlived its display connection.", window.id()),
            }
        }
        self.flags = WindowFlags::default();
    }
}

impl NativeBindings for XlibBindings {
    fn open_display(&mut self) -> Result<()> {
        if self.connection().is_ok() {
            warn!("open_display called with the display already open.");
            return Ok(());
        }
        self.connection = Some(Connection::open(self.display_name.as_deref())?);
        Ok(())
    }

    fn close_display(&mut self) {
        if self.window.is_some() {
            warn!("Closing the display with a live window; destroying it first.");
            self.destroy_window_now();
        }
        if !self.peers.is_empty() {
            warn!("Closing the display with {} live peers.", self.peers.len());
        }
        if let Some(mut conn) = self.connection.take() {
            conn.close();
        }
    }

    fn create_display_peer(&mut self, pixel_format: &PixelFormat) -> Result<PeerHandle> {
        let visual = {
            let conn = self.connection()?;
            self.with_glx("create_display_peer", |glx| GlxVisual::choose(glx, conn, pixel_format))?
        };
        debug!("GLX visual {:#x} chosen for {:?}", visual.visual_id(), pixel_format);
        Ok(self.insert_peer(Peer::Display(visual)))
    }

    fn destroy_display_peer(&mut self, peer: PeerHandle) {
        match self.peers.remove(&peer.raw()) {
            Some(Peer::Display(visual)) => visual.free(),
            Some(other) => {
                warn!("destroy_display_peer given pbuffer {:?}; ignoring.", peer);
                self.peers.insert(peer.raw(), other);
            }
            None => warn!("destroy_display_peer given unknown peer {:?}.", peer),
        }
    }

    fn create_pbuffer(&mut self, width: u32, height: u32, pixel_format: &PixelFormat) -> Result<PeerHandle> {
        let pbuffer = {
            let conn = self.connection()?;
            self.with_glx("create_pbuffer", |glx| {
                GlxPbuffer::create(glx, conn, width, height, pixel_format)
            })?
        };
        Ok(self.insert_peer(Peer::Pbuffer(pbuffer)))
    }

    fn destroy_pbuffer(&mut self, peer: PeerHandle) {
        match self.peers.remove(&peer.raw()) {
            Some(Peer::Pbuffer(pbuffer)) => {
                let slot = self.glx.lock();
                match (slot.as_ref(), self.connection.as_ref()) {
                    (Some(glx), Some(conn)) => pbuffer.destroy(glx, conn),
                    _ => warn!("Pbuffer {:#x} outlived GLX or its display.", pbuffer.id()),
                }
            }
            Some(other) => {
                warn!("destroy_pbuffer given display peer {:?}; ignoring.", peer);
                self.peers.insert(peer.raw(), other);
            }
            None => warn!("destroy_pbuffer given unknown peer {:?}.", peer),
        }
    }

    fn pbuffer_capabilities(&mut self) -> PbufferCapabilities {
        let Ok(conn) = self.connection() else {
            return PbufferCapabilities::empty();
        };
        glx::pbuffer_capabilities(self.glx.lock().as_ref(), conn)
    }

    fn create_window(&mut self, peer: PeerHandle, mode: &DisplayMode, fullscreen: bool, x: i32, y: i32) -> Result<()> {
        if self.window.is_some() {
            return Err(DisplayError::InvalidArgument("a window already exists".to_string()));
        }
        let conn = self.connection()?;
        let window = Window::create(conn, self.visual(peer)?, mode, fullscreen, x, y)?;
        self.window = Some(window);
        self.flags = WindowFlags::mapped();
        Ok(())
    }

    fn destroy_window(&mut self) {
        self.destroy_window_now();
    }

    fn set_title(&mut self, title: &str) {
        if let (Some(window), Some(conn)) = (self.window.as_ref(), self.connection.as_ref()) {
            window.set_title(conn, title);
        }
    }

    fn is_close_requested(&mut self) -> bool {
        self.flags.take_close_requested()
    }

    fn is_visible(&mut self) -> bool {
        self.flags.is_visible()
    }

    fn is_active(&mut self) -> bool {
        self.flags.is_active()
    }

    fn is_dirty(&mut self) -> bool {
        self.flags.take_dirty()
    }

    fn update(&mut self) {
        if let (Some(window), Some(conn)) = (self.window.as_mut(), self.connection.as_ref()) {
            event::process_pending_events(
                conn,
                window,
                &mut self.flags,
                &mut self.mouse,
                &mut self.keyboard,
            );
        }
    }

    fn reshape(&mut self, x: i32, y: i32, width: u32, height: u32) {
        if let (Some(window), Some(conn)) = (self.window.as_mut(), self.connection.as_ref()) {
            window.reshape(conn, x, y, width, height);
        }
    }

    fn init(&mut self) -> Result<DisplayMode> {
        let conn = self.connection.as_ref().ok_or_else(|| {
            DisplayError::DisplayUnavailable("X display is not open".to_string())
        })?;
        self.vid_mode.init(conn)
    }

    fn switch_display_mode(&mut self, mode: &DisplayMode) -> Result<()> {
        let conn = self.connection.as_ref().ok_or_else(|| {
            DisplayError::DisplayUnavailable("X display is not open".to_string())
        })?;
        self.vid_mode.switch_mode(conn, mode)
    }

    fn reset_display_mode(&mut self) {
        match self.connection.as_ref() {
            Some(conn) => self.vid_mode.reset(conn),
            None => warn!("reset_display_mode without an open display; nothing restored."),
        }
    }

    fn get_available_display_modes(&mut self) -> Result<Vec<DisplayMode>> {
        self.vid_mode.available_modes(self.connection()?)
    }

    fn get_gamma_ramp_length(&mut self) -> usize {
        self.connection()
            .map(|conn| self.vid_mode.gamma_ramp_length(conn))
            .unwrap_or(0)
    }

    fn set_gamma_ramp(&mut self, ramp: &[f32]) -> Result<()> {
        let conn = self.connection.as_ref().ok_or_else(|| {
            DisplayError::DisplayUnavailable("X display is not open".to_string())
        })?;
        self.vid_mode.set_gamma_ramp(conn, ramp)
    }

    fn create_mouse(&mut self) {
        self.mouse.activate();
        info!("Mouse created.");
    }

    fn destroy_mouse(&mut self) {
        self.grab_mouse(false);
        self.mouse.deactivate();
        info!("Mouse destroyed.");
    }

    fn poll_mouse(&mut self, state: &mut MouseState) {
        self.mouse.poll(state);
    }

    fn read_mouse(&mut self, buffer: &mut [MouseEvent]) -> usize {
        self.mouse.read(buffer)
    }

    fn grab_mouse(&mut self, grab: bool) {
        let (Some(window), Some(conn)) = (self.window.as_mut(), self.connection.as_ref()) else {
            return;
        };
        window.grab_pointer(conn, grab);
        if window.is_grabbed() {
            window.warp_pointer_to_center(conn);
            let (cx, cy) = window.center();
            self.mouse.set_reference(cx, cy);
        } else {
            self.mouse.forget_position();
        }
    }

    fn native_cursor_capabilities(&mut self) -> Result<CursorCapabilities> {
        cursor::capabilities(self.connection()?)
    }

    fn set_native_cursor(&mut self, handle: Option<&CursorHandle>) -> Result<()> {
        let (Some(window), Some(conn)) = (self.window.as_mut(), self.connection.as_ref()) else {
            return Err(DisplayError::platform(
                "XDefineCursor",
                "no window to define the cursor on",
            ));
        };
        window.define_cursor(conn, handle.map(|h| h.id() as xlib::Cursor));
        Ok(())
    }

    fn min_cursor_size(&mut self) -> u32 {
        self.connection().map(cursor::min_size).unwrap_or(0)
    }

    fn max_cursor_size(&mut self) -> u32 {
        self.connection().map(cursor::max_size).unwrap_or(0)
    }

    fn create_cursor(&mut self, handle: &mut CursorHandle, image: &CursorImage<'_>) -> Result<()> {
        let id = cursor::create(self.connection()?, image)?;
        handle.store_id(u64::from(id));
        Ok(())
    }

    fn destroy_cursor(&mut self, handle: &CursorHandle) {
        let id = handle.id() as xlib::Cursor;
        if let (Some(window), Some(conn)) = (self.window.as_mut(), self.connection.as_ref()) {
            if window.current_cursor() == Some(id) {
                window.define_cursor(conn, None);
            }
        }
        match self.connection.as_ref() {
            Some(conn) => cursor::destroy(conn, id),
            None => warn!("Cursor {:#x} outlived its display; not freed.", id),
        }
    }

    fn create_keyboard(&mut self) -> Result<()> {
        self.keyboard.activate();
        info!("Keyboard created.");
        Ok(())
    }

    fn destroy_keyboard(&mut self) {
        self.keyboard.deactivate();
        info!("Keyboard destroyed.");
    }

    fn poll_keyboard(&mut self, keys: &mut [u8; KEYBOARD_SIZE]) {
        self.keyboard.poll(keys);
    }

    fn read_keyboard(&mut self, buffer: &mut [KeyEvent]) -> usize {
        self.keyboard.read(buffer)
    }
}

impl Drop for XlibBindings {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!("X11 bindings dropped with the display still open; closing it.");
            self.close_display();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings() -> XlibBindings {
        XlibBindings::new(None, SharedGlx::new(), &InputConfig::default())
    }

    #[test]
    fn queries_without_display_degrade_gracefully() {
        let mut b = bindings();
        assert_eq!(b.get_gamma_ramp_length(), 0);
        assert_eq!(b.min_cursor_size(), 0);
        assert_eq!(b.max_cursor_size(), 0);
        assert!(b.pbuffer_capabilities().is_empty());
        assert!(matches!(
            b.native_cursor_capabilities(),
            Err(DisplayError::DisplayUnavailable(_))
        ));
    }

    #[test]
    fn peer_creation_requires_open_display() {
        let mut b = bindings();
        let err = b.create_display_peer(&PixelFormat::default()).unwrap_err();
        assert!(matches!(err, DisplayError::DisplayUnavailable(_)));
    }

    #[test]
    fn cursor_without_window_is_an_error() {
        let mut b = bindings();
        assert!(b.set_native_cursor(None).is_err());
    }

    #[test]
    fn input_works_without_a_window() {
        let mut b = bindings();
        b.create_keyboard().unwrap();
        b.create_mouse();
        let mut keys = [0u8; KEYBOARD_SIZE];
        b.poll_keyboard(&mut keys);
        assert!(keys.iter().all(|&k| k == 0));
        let mut events = [MouseEvent::default(); 4];
        assert_eq!(b.read_mouse(&mut events), 0);
        b.destroy_mouse();
        b.destroy_keyboard();
    }

    #[test]
    fn unknown_peers_are_ignored_on_destroy() {
        let mut b = bindings();
        b.destroy_display_peer(PeerHandle::new(42));
        b.destroy_pbuffer(PeerHandle::new(42));
        assert!(b.peers.is_empty());
    }
}
