// src/platform/backends/x11/event.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use super::input::{KeyboardInput, MouseInput};
use super::window::Window;
use crate::keys::translate_keysym;

use log::{debug, info, trace};
use std::mem;
use std::ptr;

// X11 library imports
use libc::{c_char, c_int};
use x11::xlib;

/// Buffer size for text obtained from `XLookupString`.
const KEY_TEXT_BUFFER_SIZE: usize = 32;

/// Window state derived from X events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowFlags {
    close_requested: bool,
    visible: bool,
    active: bool,
    dirty: bool,
}

impl WindowFlags {
    /// State of a freshly mapped window: it needs a first paint.
    pub fn mapped() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    /// Reports and clears a pending close request.
    pub fn take_close_requested(&mut self) -> bool {
        mem::take(&mut self.close_requested)
    }

    /// Reports and clears the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        mem::take(&mut self.dirty)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn close_requested(&mut self) {
        self.close_requested = true;
    }

    fn exposed(&mut self) {
        self.dirty = true;
    }

    fn visibility(&mut self, state: c_int) {
        self.visible = state != xlib::VisibilityFullyObscured;
    }

    fn unmapped(&mut self) {
        self.visible = false;
    }

    fn focus(&mut self, active: bool) {
        self.active = active;
    }
}

/// Translates a key event into a key code and, on press, the character it
/// types.
fn translate_key(key_event: &mut xlib::XKeyEvent, pressed: bool) -> (u8, Option<char>) {
    // SAFETY: key_event is a valid event from XNextEvent.
    let keysym = unsafe { xlib::XLookupKeysym(key_event, 0) };
    let key = translate_keysym(u32::try_from(keysym).unwrap_or(0));
    if !pressed {
        return (key, None);
    }

    let mut text_keysym: xlib::KeySym = 0;
    let mut text_buffer = [0u8; KEY_TEXT_BUFFER_SIZE];
    // SAFETY: the buffer and keysym out-pointer are valid for the call;
    // no compose status is needed.
    let count = unsafe {
        xlib::XLookupString(
            key_event,
            text_buffer.as_mut_ptr() as *mut c_char,
            text_buffer.len() as c_int,
            &mut text_keysym,
            ptr::null_mut(),
        )
    };
    let character = usize::try_from(count)
        .ok()
        .filter(|&n| n > 0)
        .and_then(|n| std::str::from_utf8(&text_buffer[..n]).ok())
        .and_then(|text| text.chars().next())
        .or_else(|| keysym_to_char(text_keysym));
    (key, character)
}

/// Latin-1 and Unicode keysyms map directly onto characters.
fn keysym_to_char(keysym: xlib::KeySym) -> Option<char> {
    let keysym = u32::try_from(keysym).ok()?;
    match keysym {
        0x20..=0x7E | 0xA0..=0xFF => char::from_u32(keysym),
        0x0100_0100..=0x0110_FFFF => char::from_u32(keysym - 0x0100_0000),
        _ => None,
    }
}

/// Drains the X event queue into the window flags and input state.
///
/// Events for other windows are dropped. A grabbed pointer is warped back
/// to the window centre after each motion so deltas keep coming.
pub fn process_pending_events(
    connection: &Connection,
    window: &mut Window,
    flags: &mut WindowFlags,
    mouse: &mut MouseInput,
    keyboard: &mut KeyboardInput,
) {
    let display = connection.display();
    if display.is_null() {
        return;
    }

    // SAFETY: display is open; XNextEvent only runs when an event is pending.
    while unsafe { xlib::XPending(display) } > 0 {
        let mut xevent: xlib::XEvent = unsafe { mem::zeroed() };
        unsafe { xlib::XNextEvent(display, &mut xevent) };

        // SAFETY: `type_` and `any` are valid for every event.
        let (event_type, event_window) = unsafe { (xevent.type_, xevent.any.window) };
        if event_window != window.id() {
            trace!("XEvent: type {} for foreign window {}", event_type, event_window);
            continue;
        }

        // SAFETY: each arm reads the union member matching `event_type`.
        match event_type {
            xlib::Expose => {
                let expose_event = unsafe { xevent.expose };
                if expose_event.count == 0 {
                    trace!("XEvent: Expose on window {}", expose_event.window);
                    flags.exposed();
                }
            }
            xlib::VisibilityNotify => {
                let visibility_event = unsafe { xevent.visibility };
                flags.visibility(visibility_event.state);
                debug!("XEvent: VisibilityNotify (state: {})", visibility_event.state);
            }
            xlib::MapNotify => {
                flags.visibility(xlib::VisibilityUnobscured);
                flags.exposed();
            }
            xlib::UnmapNotify => {
                flags.unmapped();
            }
            xlib::ConfigureNotify => {
                let configure_event = unsafe { xevent.configure };
                let width = u32::try_from(configure_event.width).unwrap_or(0);
                let height = u32::try_from(configure_event.height).unwrap_or(0);
                if window.dimensions() != (width, height) {
                    window.update_dimensions(width, height);
                    flags.exposed();
                }
            }
            xlib::ClientMessage => {
                let client_message_event = unsafe { xevent.client_message };
                if client_message_event.data.as_longs()[0] as xlib::Atom
                    == window.wm_delete_window_atom()
                {
                    info!("XEvent: WM_DELETE_WINDOW received for window {}.", event_window);
                    flags.close_requested();
                }
            }
            xlib::FocusIn => {
                debug!("XEvent: FocusIn on window {}.", event_window);
                flags.focus(true);
            }
            xlib::FocusOut => {
                debug!("XEvent: FocusOut on window {}.", event_window);
                flags.focus(false);
                keyboard.release_all();
            }
            xlib::KeyPress | xlib::KeyRelease => {
                let pressed = event_type == xlib::KeyPress;
                let key_event = unsafe { &mut xevent.key };
                let (key, character) = translate_key(key_event, pressed);
                trace!("XEvent: key {} pressed: {} char: {:?}", key, pressed, character);
                keyboard.key(key, pressed, character);
            }
            xlib::ButtonPress | xlib::ButtonRelease => {
                let button_event = unsafe { xevent.button };
                mouse.button(button_event.button, event_type == xlib::ButtonPress);
            }
            xlib::MotionNotify => {
                let motion_event = unsafe { xevent.motion };
                mouse.motion(motion_event.x, motion_event.y);
                if window.is_grabbed() {
                    let (cx, cy) = window.center();
                    if (motion_event.x, motion_event.y) != (cx, cy) {
                        window.warp_pointer_to_center(connection);
                        mouse.set_reference(cx, cy);
                    }
                }
            }
            _ => {
                trace!("XEvent: Unhandled event type {}", event_type);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_window_starts_dirty_and_inactive() {
        let mut flags = WindowFlags::mapped();
        assert!(!flags.is_active());
        assert!(flags.take_dirty());
        assert!(!flags.take_dirty());
    }

    #[test]
    fn close_request_is_reported_once() {
        let mut flags = WindowFlags::default();
        flags.close_requested();
        assert!(flags.take_close_requested());
        assert!(!flags.take_close_requested());
    }

    #[test]
    fn fully_obscured_window_is_not_visible() {
        let mut flags = WindowFlags::default();
        flags.visibility(xlib::VisibilityPartiallyObscured);
        assert!(flags.is_visible());
        flags.visibility(xlib::VisibilityFullyObscured);
        assert!(!flags.is_visible());
        flags.visibility(xlib::VisibilityUnobscured);
        flags.unmapped();
        assert!(!flags.is_visible());
    }

    #[test]
    fn focus_tracks_activity() {
        let mut flags = WindowFlags::default();
        flags.focus(true);
        assert!(flags.is_active());
        flags.focus(false);
        assert!(!flags.is_active());
    }

    #[test]
    fn keysym_characters() {
        assert_eq!(keysym_to_char(0x61), Some('a'));
        assert_eq!(keysym_to_char(0xE9), Some('é'));
        assert_eq!(keysym_to_char(0x0100_20AC), Some('€'));
        assert_eq!(keysym_to_char(0xFF0D), None); // Return
    }
}
