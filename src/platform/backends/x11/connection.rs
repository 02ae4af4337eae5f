// src/platform/backends/x11/connection.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use crate::error::{DisplayError, Result};
use log::{debug, info, warn};
use std::ffi::CString;
use std::ptr;

// X11 library imports
use libc::c_int;
use x11::xlib;

/// Owns a `*mut xlib::Display`, closing it on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    /// Calls `XOpenDisplay` with `name`, or with NULL (the DISPLAY
    /// environment variable) when no name is given.
    fn open(name: Option<&str>) -> Result<Self> {
        let name_c = name
            .map(CString::new)
            .transpose()
            .map_err(|e| DisplayError::InvalidArgument(format!("display name: {}", e)))?;
        let name_ptr = name_c.as_ref().map_or(ptr::null(), |n| n.as_ptr());

        // SAFETY: name_ptr is NULL or a NUL-terminated string that outlives the call.
        let display_ptr = unsafe { xlib::XOpenDisplay(name_ptr) };
        if display_ptr.is_null() {
            Err(DisplayError::DisplayUnavailable(format!(
                "could not open X display {}. Check DISPLAY or X server status.",
                name.unwrap_or("$DISPLAY")
            )))
        } else {
            debug!("X display opened: {:p}", display_ptr);
            Ok(Self { ptr: display_ptr })
        }
    }

    #[inline]
    fn raw(&self) -> *mut xlib::Display {
        self.ptr
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            info!("Closing X11 display connection: {:p}", self.ptr);
            // SAFETY: ptr came from XOpenDisplay and is closed exactly once.
            unsafe {
                xlib::XCloseDisplay(self.ptr);
            }
        }
    }
}

/// An open connection to the X server plus its default screen.
///
/// Dropping the connection closes the display.
#[derive(Debug)]
pub struct Connection {
    managed_display: ManagedDisplay,
    screen: c_int,
}

impl Connection {
    /// Opens the named display, or the one in `DISPLAY` when `name` is `None`.
    pub fn open(name: Option<&str>) -> Result<Self> {
        info!("Establishing X11 server connection.");
        let managed_display = ManagedDisplay::open(name)?;

        // SAFETY: the display pointer is valid for the lifetime of managed_display.
        let screen = unsafe { xlib::XDefaultScreen(managed_display.raw()) };
        debug!("Default screen number: {}", screen);

        info!("X11 server connection established.");
        Ok(Connection {
            managed_display,
            screen,
        })
    }

    /// Closes the display now. Idempotent; a closed connection reports a
    /// null display pointer.
    pub fn close(&mut self) {
        let ptr = std::mem::replace(&mut self.managed_display.ptr, ptr::null_mut());
        if ptr.is_null() {
            debug!("X11 display connection already closed; close skipped.");
            return;
        }
        drop(ManagedDisplay { ptr });
    }

    /// A connection that was never opened.
    #[cfg(test)]
    pub(crate) fn closed() -> Self {
        Connection {
            managed_display: ManagedDisplay {
                ptr: ptr::null_mut(),
            },
            screen: 0,
        }
    }

    /// Raw display pointer, null once closed.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.managed_display.raw()
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.managed_display.ptr.is_null()
    }

    #[inline]
    pub fn screen(&self) -> c_int {
        self.screen
    }

    /// Root window of the default screen.
    pub fn root(&self) -> xlib::Window {
        // SAFETY: callers only use the root while the connection is open.
        unsafe { xlib::XRootWindow(self.display(), self.screen) }
    }

    /// Depth of the default screen, reported as the bits per pixel of modes.
    pub fn default_depth(&self) -> u32 {
        // SAFETY: as for root().
        let depth = unsafe { xlib::XDefaultDepth(self.display(), self.screen) };
        u32::try_from(depth).unwrap_or_else(|_| {
            warn!("XDefaultDepth returned {}; reporting 0.", depth);
            0
        })
    }

    /// Sends buffered requests to the server.
    pub fn flush(&self) {
        if self.is_open() {
            // SAFETY: display is open.
            unsafe {
                xlib::XFlush(self.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_is_idempotent_on_closed_connection() {
        let mut conn = Connection::closed();
        conn.close();
        conn.close();
        assert!(!conn.is_open());
        assert!(conn.display().is_null());
    }

    #[test]
    fn flush_on_closed_connection_is_a_no_op() {
        let conn = Connection::closed();
        conn.flush();
        assert!(!conn.is_open());
    }

    #[test]
    fn display_name_with_interior_nul_is_rejected() {
        let err = Connection::open(Some(":0\0junk")).unwrap_err();
        assert!(matches!(err, DisplayError::InvalidArgument(_)));
    }
}
