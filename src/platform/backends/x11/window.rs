// src/platform/backends/x11/window.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use super::cursor;
use super::glx::GlxVisual;
use crate::display::DisplayMode;
use crate::error::{DisplayError, Result};
use log::{debug, error, info, trace, warn};
use std::ffi::CString;
use std::mem;

// X11 library imports
use libc::{c_char, c_int, c_uint, c_ulong};
use x11::xlib;

/// Events the window listens for.
const EVENT_MASK: libc::c_long = xlib::ExposureMask
    | xlib::StructureNotifyMask
    | xlib::VisibilityChangeMask
    | xlib::FocusChangeMask
    | xlib::KeyPressMask
    | xlib::KeyReleaseMask
    | xlib::ButtonPressMask
    | xlib::ButtonReleaseMask
    | xlib::PointerMotionMask;

fn positive(value: u32) -> c_uint {
    value.max(1)
}

/// The GL window created from a display peer's visual.
///
/// Server-side resources are released by [`Window::cleanup`], which the
/// owner calls before the connection closes. `Drop` only logs a missed
/// cleanup since it has no display to talk to.
#[derive(Debug)]
pub struct Window {
    id: xlib::Window,
    colormap: xlib::Colormap,
    wm_delete_window: xlib::Atom,
    width: u32,
    height: u32,
    fullscreen: bool,
    invisible_cursor: Option<xlib::Cursor>,
    current_cursor: Option<xlib::Cursor>,
    grabbed: bool,
}

impl Window {
    /// Creates and maps a window using the peer's visual.
    ///
    /// A fullscreen window covers the screen from the origin at the mode's
    /// size and bypasses the window manager.
    pub fn create(
        connection: &Connection,
        visual: &GlxVisual,
        mode: &DisplayMode,
        fullscreen: bool,
        x: i32,
        y: i32,
    ) -> Result<Self> {
        if !connection.is_open() {
            return Err(DisplayError::DisplayUnavailable(
                "window creation without an open display".to_string(),
            ));
        }
        let (x, y) = if fullscreen { (0, 0) } else { (x, y) };
        info!(
            "Creating X11 window: {}x{} at ({}, {}), fullscreen: {}",
            mode.width, mode.height, x, y, fullscreen
        );
        let display = connection.display();
        let root = connection.root();

        // SAFETY: display is open; visual comes from the same display.
        let (id, colormap) = unsafe {
            let colormap = xlib::XCreateColormap(display, root, visual.visual(), xlib::AllocNone);

            let mut attributes: xlib::XSetWindowAttributes = mem::zeroed();
            attributes.colormap = colormap;
            attributes.background_pixel = 0;
            attributes.border_pixel = 0;
            attributes.event_mask = EVENT_MASK;
            attributes.override_redirect = if fullscreen { xlib::True } else { xlib::False };
            let mut mask: c_ulong =
                xlib::CWColormap | xlib::CWBackPixel | xlib::CWBorderPixel | xlib::CWEventMask;
            if fullscreen {
                mask |= xlib::CWOverrideRedirect;
            }

            let id = xlib::XCreateWindow(
                display,
                root,
                x,
                y,
                positive(mode.width),
                positive(mode.height),
                0,
                visual.depth(),
                xlib::InputOutput as c_uint,
                visual.visual(),
                mask,
                &mut attributes,
            );
            (id, colormap)
        };

        if id == 0 {
            // SAFETY: colormap was created above on this display.
            unsafe { xlib::XFreeColormap(display, colormap) };
            return Err(DisplayError::platform("XCreateWindow", "window creation failed"));
        }
        debug!("X window created (ID: {})", id);

        let mut window = Self {
            id,
            colormap,
            wm_delete_window: 0,
            width: mode.width,
            height: mode.height,
            fullscreen,
            invisible_cursor: None,
            current_cursor: None,
            grabbed: false,
        };
        window.setup_protocols(connection);
        window.map(connection);
        Ok(window)
    }

    fn setup_protocols(&mut self, connection: &Connection) {
        let display = connection.display();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            self.wm_delete_window = xlib::XInternAtom(
                display,
                b"WM_DELETE_WINDOW\0".as_ptr() as *const c_char,
                xlib::False,
            );
            if self.wm_delete_window != 0 {
                let mut protocols = [self.wm_delete_window];
                xlib::XSetWMProtocols(display, self.id, protocols.as_mut_ptr(), 1);
                debug!("WM_PROTOCOLS (WM_DELETE_WINDOW) registered.");
            } else {
                warn!("Failed to get WM_DELETE_WINDOW atom. Window close events might not be received.");
            }

            // Fixed-size window: the size only changes through reshape.
            let mut size_hints: xlib::XSizeHints = mem::zeroed();
            size_hints.flags = xlib::PMinSize | xlib::PMaxSize;
            size_hints.min_width = positive(self.width) as c_int;
            size_hints.max_width = positive(self.width) as c_int;
            size_hints.min_height = positive(self.height) as c_int;
            size_hints.max_height = positive(self.height) as c_int;
            xlib::XSetWMNormalHints(display, self.id, &mut size_hints);
        }
    }

    fn map(&self, connection: &Connection) {
        let display = connection.display();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            xlib::XMapRaised(display, self.id);
            if self.fullscreen {
                xlib::XSetInputFocus(display, self.id, xlib::RevertToParent, xlib::CurrentTime);
            }
        }
        connection.flush();
        debug!("Window {} mapped.", self.id);
    }

    /// Sets `WM_NAME` and the UTF-8 `_NET_WM_NAME`.
    pub fn set_title(&self, connection: &Connection, title: &str) {
        if self.id == 0 || !connection.is_open() {
            warn!("set_title called without a live window.");
            return;
        }
        let title_c_str = match CString::new(title) {
            Ok(title) => title,
            Err(e) => {
                warn!("Ignoring window title with interior NUL: {}", e);
                return;
            }
        };
        trace!("Setting window title to '{}' for window ID: {}", title, self.id);
        let display = connection.display();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            xlib::XStoreName(display, self.id, title_c_str.as_ptr() as *mut c_char);

            let net_wm_name_atom = xlib::XInternAtom(
                display,
                b"_NET_WM_NAME\0".as_ptr() as *const c_char,
                xlib::False,
            );
            let utf8_string_atom = xlib::XInternAtom(
                display,
                b"UTF8_STRING\0".as_ptr() as *const c_char,
                xlib::False,
            );
            if net_wm_name_atom != 0 && utf8_string_atom != 0 {
                xlib::XChangeProperty(
                    display,
                    self.id,
                    net_wm_name_atom,
                    utf8_string_atom,
                    8, // format is 8-bit for UTF8_STRING
                    xlib::PropModeReplace,
                    title_c_str.as_ptr() as *const u8,
                    title_c_str.as_bytes().len() as c_int,
                );
            }
        }
        connection.flush();
    }

    /// Moves and resizes the window. Ignored for fullscreen windows.
    pub fn reshape(&mut self, connection: &Connection, x: i32, y: i32, width: u32, height: u32) {
        if self.id == 0 || self.fullscreen {
            return;
        }
        self.width = width;
        self.height = height;
        let display = connection.display();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            let mut size_hints: xlib::XSizeHints = mem::zeroed();
            size_hints.flags = xlib::PMinSize | xlib::PMaxSize;
            size_hints.min_width = positive(width) as c_int;
            size_hints.max_width = positive(width) as c_int;
            size_hints.min_height = positive(height) as c_int;
            size_hints.max_height = positive(height) as c_int;
            xlib::XSetWMNormalHints(display, self.id, &mut size_hints);
            xlib::XMoveResizeWindow(display, self.id, x, y, positive(width), positive(height));
        }
        connection.flush();
        debug!("Window {} reshaped to {}x{} at ({}, {})", self.id, width, height, x, y);
    }

    /// Defines the cursor shown over the window. `None` restores the
    /// parent's cursor. While grabbed, the invisible cursor stays in place.
    pub fn define_cursor(&mut self, connection: &Connection, cursor: Option<xlib::Cursor>) {
        self.current_cursor = cursor;
        if !self.grabbed {
            self.apply_cursor(connection, cursor);
        }
    }

    fn apply_cursor(&self, connection: &Connection, cursor: Option<xlib::Cursor>) {
        let display = connection.display();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            match cursor {
                Some(cursor) => xlib::XDefineCursor(display, self.id, cursor),
                None => xlib::XUndefineCursor(display, self.id),
            };
        }
        connection.flush();
    }

    /// Confines the pointer to the window and hides it, or releases it.
    pub fn grab_pointer(&mut self, connection: &Connection, grab: bool) {
        if self.id == 0 || self.grabbed == grab {
            return;
        }
        let display = connection.display();
        if grab {
            if self.invisible_cursor.is_none() {
                self.invisible_cursor = cursor::create_invisible(connection, self.id);
            }
            // SAFETY: display is open and the window belongs to it.
            let status = unsafe {
                xlib::XGrabPointer(
                    display,
                    self.id,
                    xlib::False,
                    (xlib::ButtonPressMask | xlib::ButtonReleaseMask | xlib::PointerMotionMask)
                        as c_uint,
                    xlib::GrabModeAsync,
                    xlib::GrabModeAsync,
                    self.id,
                    self.invisible_cursor.unwrap_or(0),
                    xlib::CurrentTime,
                )
            };
            if status != xlib::GrabSuccess {
                warn!("XGrabPointer failed with status {}", status);
                return;
            }
            self.grabbed = true;
            self.apply_cursor(connection, self.invisible_cursor);
        } else {
            // SAFETY: display is open.
            unsafe {
                xlib::XUngrabPointer(display, xlib::CurrentTime);
            }
            self.grabbed = false;
            self.apply_cursor(connection, self.current_cursor);
        }
        debug!("Pointer grab: {}", self.grabbed);
    }

    /// Moves the pointer to the window centre.
    pub fn warp_pointer_to_center(&self, connection: &Connection) {
        let (cx, cy) = self.center();
        // SAFETY: display is open and the window belongs to it.
        unsafe {
            xlib::XWarpPointer(connection.display(), 0, self.id, 0, 0, 0, 0, cx, cy);
        }
    }

    pub fn center(&self) -> (i32, i32) {
        (
            i32::try_from(self.width / 2).unwrap_or(i32::MAX),
            i32::try_from(self.height / 2).unwrap_or(i32::MAX),
        )
    }

    /// The cursor last passed to [`Window::define_cursor`].
    pub fn current_cursor(&self) -> Option<xlib::Cursor> {
        self.current_cursor
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    /// Destroys the window and its colormap. Idempotent.
    pub fn cleanup(&mut self, connection: &Connection) {
        if self.id == 0 {
            return;
        }
        if !connection.is_open() {
            warn!("Window {} outlived its display connection.", self.id);
            self.id = 0;
            return;
        }
        info!("Destroying X11 window (ID: {}).", self.id);
        let display = connection.display();
        // SAFETY: display is open and these resources belong to it.
        unsafe {
            if self.grabbed {
                xlib::XUngrabPointer(display, xlib::CurrentTime);
            }
            xlib::XDestroyWindow(display, self.id);
            xlib::XFreeColormap(display, self.colormap);
        }
        if let Some(invisible) = self.invisible_cursor.take() {
            cursor::destroy(connection, invisible);
        }
        connection.flush();
        self.id = 0;
        self.grabbed = false;
        debug!("Window destroyed.");
    }

    #[inline]
    pub fn id(&self) -> xlib::Window {
        self.id
    }

    #[inline]
    pub fn wm_delete_window_atom(&self) -> xlib::Atom {
        self.wm_delete_window
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn update_dimensions(&mut self, width: u32, height: u32) {
        if (self.width, self.height) != (width, height) {
            debug!(
                "Updating cached window dimensions from {}x{} to {}x{}",
                self.width, self.height, width, height
            );
            self.width = width;
            self.height = height;
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.id != 0 {
            error!(
                "Window (ID: {}) dropped without explicit cleanup. Associated X server resources may be leaked.",
                self.id
            );
        }
    }
}
