// src/testing/recording.rs

use super::counting_lock::CountingLock;
use crate::display::{
    CursorCapabilities, CursorHandle, CursorImage, DisplayMode, KeyEvent, MouseEvent, MouseState,
    PbufferCapabilities, PeerHandle, PixelFormat, KEYBOARD_SIZE,
};
use crate::error::{DisplayError, Result};
use crate::platform::bindings::NativeBindings;
use crate::platform::library::GlLibrary;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// One native call as seen by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeCall {
    pub name: &'static str,
    /// Whether the observed toolkit lock was held during the call.
    pub lock_held: bool,
}

#[derive(Debug)]
struct RecorderState {
    calls: Vec<NativeCall>,
    failures: HashMap<&'static str, DisplayError>,
    panics: HashSet<&'static str>,
    delay: Duration,
    in_call: bool,
    overlaps: usize,

    display_open: bool,
    opens: usize,
    closes: usize,
    library_refs: usize,
    loads: usize,
    unloads: usize,
    next_id: u64,
    live_peers: HashSet<u64>,
    live_cursors: HashSet<u64>,

    desktop_mode: DisplayMode,
    modes: Vec<DisplayMode>,
    gamma_ramp_length: usize,
    cursor_capabilities: CursorCapabilities,
    pbuffer_capabilities: PbufferCapabilities,
}

impl Default for RecorderState {
    fn default() -> Self {
        let desktop_mode = DisplayMode::new(1024, 768, 24, 60);
        Self {
            calls: Vec::new(),
            failures: HashMap::new(),
            panics: HashSet::new(),
            delay: Duration::ZERO,
            in_call: false,
            overlaps: 0,
            display_open: false,
            opens: 0,
            closes: 0,
            library_refs: 0,
            loads: 0,
            unloads: 0,
            next_id: 1,
            live_peers: HashSet::new(),
            live_cursors: HashSet::new(),
            desktop_mode,
            modes: vec![desktop_mode, DisplayMode::new(800, 600, 24, 60)],
            gamma_ramp_length: 256,
            cursor_capabilities: CursorCapabilities::all(),
            pbuffer_capabilities: PbufferCapabilities::PBUFFER_SUPPORTED,
        }
    }
}

impl RecorderState {
    fn require_open(&self, op: &str) -> Result<()> {
        if self.display_open {
            Ok(())
        } else {
            Err(DisplayError::DisplayUnavailable(format!("{} with the display closed", op)))
        }
    }

    fn require_library(&self, op: &str) -> Result<()> {
        if self.library_refs > 0 {
            Ok(())
        } else {
            Err(DisplayError::LibraryLoad(format!("{} without the GL library", op)))
        }
    }

    fn new_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Shared view of everything the recording doubles did.
///
/// Clones share state, so a test keeps one and moves the bindings and
/// loader into the backend.
#[derive(Clone)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
    lock: Arc<CountingLock>,
}

impl Recorder {
    /// Records calls, noting for each whether `lock` was held.
    pub fn new(lock: Arc<CountingLock>) -> Self {
        Self {
            state: Arc::default(),
            lock,
        }
    }

    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn bindings(&self) -> RecordingBindings {
        RecordingBindings {
            recorder: self.clone(),
        }
    }

    pub fn loader(&self) -> RecordingLoader {
        RecordingLoader {
            recorder: self.clone(),
        }
    }

    // --- Behaviour ---

    /// Makes every later call named `name` fail with `error`.
    pub fn fail(&self, name: &'static str, error: DisplayError) {
        self.state().failures.insert(name, error);
    }

    pub fn succeed(&self, name: &'static str) {
        self.state().failures.remove(name);
    }

    /// Makes every later call named `name` panic.
    pub fn panic_on(&self, name: &'static str) {
        self.state().panics.insert(name);
    }

    /// Makes every call stall for `delay`, widening race windows.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = delay;
    }

    pub fn set_cursor_capabilities(&self, caps: CursorCapabilities) {
        self.state().cursor_capabilities = caps;
    }

    pub fn set_pbuffer_capabilities(&self, caps: PbufferCapabilities) {
        self.state().pbuffer_capabilities = caps;
    }

    pub fn set_modes(&self, desktop: DisplayMode, modes: Vec<DisplayMode>) {
        let mut state = self.state();
        state.desktop_mode = desktop;
        state.modes = modes;
    }

    // --- Observations ---

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.state().calls.iter().map(|call| call.name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|call| call.name == name).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Calls that ran while another call was still in progress.
    pub fn overlaps(&self) -> usize {
        self.state().overlaps
    }

    pub fn is_display_open(&self) -> bool {
        self.state().display_open
    }

    pub fn opens(&self) -> usize {
        self.state().opens
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }

    pub fn library_refs(&self) -> usize {
        self.state().library_refs
    }

    pub fn loads(&self) -> usize {
        self.state().loads
    }

    pub fn unloads(&self) -> usize {
        self.state().unloads
    }

    pub fn live_peers(&self) -> usize {
        self.state().live_peers.len()
    }

    pub fn live_cursors(&self) -> usize {
        self.state().live_cursors.len()
    }

    // --- Call plumbing ---

    /// Logs the start of a call and returns its injected failure, if any.
    fn enter(&self, name: &'static str) -> Option<DisplayError> {
        let lock_held = self.lock.is_held();
        let (delay, panics, failure) = {
            let mut state = self.state();
            state.calls.push(NativeCall { name, lock_held });
            if state.in_call {
                state.overlaps += 1;
            }
            state.in_call = true;
            let panics = state.panics.contains(name);
            if panics {
                state.in_call = false;
            }
            (state.delay, panics, state.failures.get(name).cloned())
        };
        if panics {
            panic!("injected panic in {}", name);
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        failure
    }

    fn leave(&self) {
        self.state().in_call = false;
    }

    /// Runs a fallible call, honouring injected failures.
    fn invoke<R>(&self, name: &'static str, f: impl FnOnce(&mut RecorderState) -> Result<R>) -> Result<R> {
        let result = match self.enter(name) {
            Some(error) => Err(error),
            None => f(&mut *self.state()),
        };
        self.leave();
        result
    }

    /// Runs an infallible call.
    fn notify<R>(&self, name: &'static str, f: impl FnOnce(&mut RecorderState) -> R) -> R {
        let _ = self.enter(name);
        let result = f(&mut *self.state());
        self.leave();
        result
    }
}

/// [`NativeBindings`] that only record.
///
/// Peers and pbuffers can only be created with the display open and the GL
/// library loaded; cursors need the display open. Violations fail the same
/// way the Xlib bindings would.
pub struct RecordingBindings {
    recorder: Recorder,
}

impl NativeBindings for RecordingBindings {
    fn open_display(&mut self) -> Result<()> {
        self.recorder.invoke("open_display", |s| {
            s.display_open = true;
            s.opens += 1;
            Ok(())
        })
    }

    fn close_display(&mut self) {
        self.recorder.notify("close_display", |s| {
            s.display_open = false;
            s.closes += 1;
        })
    }

    fn create_display_peer(&mut self, _pixel_format: &PixelFormat) -> Result<PeerHandle> {
        self.recorder.invoke("create_display_peer", |s| {
            s.require_open("create_display_peer")?;
            s.require_library("create_display_peer")?;
            let id = s.new_id();
            s.live_peers.insert(id);
            Ok(PeerHandle::new(id))
        })
    }

    fn destroy_display_peer(&mut self, peer: PeerHandle) {
        self.recorder.notify("destroy_display_peer", |s| {
            s.live_peers.remove(&peer.raw());
        })
    }

    fn create_pbuffer(&mut self, _width: u32, _height: u32, _pixel_format: &PixelFormat) -> Result<PeerHandle> {
        self.recorder.invoke("create_pbuffer", |s| {
            s.require_open("create_pbuffer")?;
            s.require_library("create_pbuffer")?;
            let id = s.new_id();
            s.live_peers.insert(id);
            Ok(PeerHandle::new(id))
        })
    }

    fn destroy_pbuffer(&mut self, peer: PeerHandle) {
        self.recorder.notify("destroy_pbuffer", |s| {
            s.live_peers.remove(&peer.raw());
        })
    }

    fn pbuffer_capabilities(&mut self) -> PbufferCapabilities {
        self.recorder.notify("pbuffer_capabilities", |s| {
            if s.display_open && s.library_refs > 0 {
                s.pbuffer_capabilities
            } else {
                PbufferCapabilities::empty()
            }
        })
    }

    fn create_window(&mut self, _peer: PeerHandle, _mode: &DisplayMode, _fullscreen: bool, _x: i32, _y: i32) -> Result<()> {
        self.recorder.invoke("create_window", |s| s.require_open("create_window"))
    }

    fn destroy_window(&mut self) {
        self.recorder.notify("destroy_window", |_| ())
    }

    fn set_title(&mut self, _title: &str) {
        self.recorder.notify("set_title", |_| ())
    }

    fn is_close_requested(&mut self) -> bool {
        self.recorder.notify("is_close_requested", |_| false)
    }

    fn is_visible(&mut self) -> bool {
        self.recorder.notify("is_visible", |_| true)
    }

    fn is_active(&mut self) -> bool {
        self.recorder.notify("is_active", |_| true)
    }

    fn is_dirty(&mut self) -> bool {
        self.recorder.notify("is_dirty", |_| false)
    }

    fn update(&mut self) {
        self.recorder.notify("update", |_| ())
    }

    fn reshape(&mut self, _x: i32, _y: i32, _width: u32, _height: u32) {
        self.recorder.notify("reshape", |_| ())
    }

    fn init(&mut self) -> Result<DisplayMode> {
        self.recorder.invoke("init", |s| {
            s.require_open("init")?;
            Ok(s.desktop_mode)
        })
    }

    fn switch_display_mode(&mut self, _mode: &DisplayMode) -> Result<()> {
        self.recorder.invoke("switch_display_mode", |_| Ok(()))
    }

    fn reset_display_mode(&mut self) {
        self.recorder.notify("reset_display_mode", |_| ())
    }

    fn get_available_display_modes(&mut self) -> Result<Vec<DisplayMode>> {
        self.recorder.invoke("get_available_display_modes", |s| {
            s.require_open("get_available_display_modes")?;
            Ok(s.modes.clone())
        })
    }

    fn get_gamma_ramp_length(&mut self) -> usize {
        self.recorder.notify("get_gamma_ramp_length", |s| {
            if s.display_open {
                s.gamma_ramp_length
            } else {
                0
            }
        })
    }

    fn set_gamma_ramp(&mut self, _ramp: &[f32]) -> Result<()> {
        self.recorder.invoke("set_gamma_ramp", |_| Ok(()))
    }

    fn create_mouse(&mut self) {
        self.recorder.notify("create_mouse", |_| ())
    }

    fn destroy_mouse(&mut self) {
        self.recorder.notify("destroy_mouse", |_| ())
    }

    fn poll_mouse(&mut self, state: &mut MouseState) {
        self.recorder.notify("poll_mouse", |_| *state = MouseState::default())
    }

    fn read_mouse(&mut self, _buffer: &mut [MouseEvent]) -> usize {
        self.recorder.notify("read_mouse", |_| 0)
    }

    fn grab_mouse(&mut self, _grab: bool) {
        self.recorder.notify("grab_mouse", |_| ())
    }

    fn native_cursor_capabilities(&mut self) -> Result<CursorCapabilities> {
        self.recorder.invoke("native_cursor_capabilities", |s| {
            s.require_open("native_cursor_capabilities")?;
            Ok(s.cursor_capabilities)
        })
    }

    fn set_native_cursor(&mut self, _cursor: Option<&CursorHandle>) -> Result<()> {
        self.recorder.invoke("set_native_cursor", |_| Ok(()))
    }

    fn min_cursor_size(&mut self) -> u32 {
        self.recorder.notify("min_cursor_size", |s| u32::from(s.display_open))
    }

    fn max_cursor_size(&mut self) -> u32 {
        self.recorder
            .notify("max_cursor_size", |s| if s.display_open { 64 } else { 0 })
    }

    fn create_cursor(&mut self, handle: &mut CursorHandle, _image: &CursorImage<'_>) -> Result<()> {
        self.recorder.invoke("create_cursor", |s| {
            s.require_open("create_cursor")?;
            let id = s.new_id();
            s.live_cursors.insert(id);
            handle.store_id(id);
            Ok(())
        })
    }

    fn destroy_cursor(&mut self, handle: &CursorHandle) {
        self.recorder.notify("destroy_cursor", |s| {
            s.live_cursors.remove(&handle.id());
        })
    }

    fn create_keyboard(&mut self) -> Result<()> {
        self.recorder.invoke("create_keyboard", |_| Ok(()))
    }

    fn destroy_keyboard(&mut self) {
        self.recorder.notify("destroy_keyboard", |_| ())
    }

    fn poll_keyboard(&mut self, keys: &mut [u8; KEYBOARD_SIZE]) {
        self.recorder.notify("poll_keyboard", |_| keys.fill(0))
    }

    fn read_keyboard(&mut self, _buffer: &mut [KeyEvent]) -> usize {
        self.recorder.notify("read_keyboard", |_| 0)
    }
}

/// [`GlLibrary`] that counts references instead of loading anything.
/// Its calls are logged as `load_library` and `unload_library`.
pub struct RecordingLoader {
    recorder: Recorder,
}

impl GlLibrary for RecordingLoader {
    fn load(&mut self) -> Result<()> {
        self.recorder.invoke("load_library", |s| {
            s.library_refs += 1;
            s.loads += 1;
            Ok(())
        })
    }

    fn unload(&mut self) {
        self.recorder.notify("unload_library", |s| {
            s.library_refs = s.library_refs.saturating_sub(1);
            s.unloads += 1;
        })
    }
}
