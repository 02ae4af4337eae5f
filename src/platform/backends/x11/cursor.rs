// src/platform/backends/x11/cursor.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

//! Native cursors through Xcursor.

use super::connection::Connection;
use crate::display::{CursorCapabilities, CursorImage};
use crate::error::{DisplayError, Result};
use log::{debug, trace, warn};
use std::mem;

// X11 library imports
use libc::{c_int, c_uint};
use x11::{xcursor, xlib};

/// Side passed to `XQueryBestCursor` when asking for the largest size.
const LARGEST_CURSOR_QUERY: c_uint = 0xFFFF;

fn require_open(conn: &Connection) -> Result<()> {
    if conn.is_open() {
        Ok(())
    } else {
        Err(DisplayError::DisplayUnavailable(
            "cursor operation without an open display".to_string(),
        ))
    }
}

pub fn capabilities(conn: &Connection) -> Result<CursorCapabilities> {
    require_open(conn)?;
    // SAFETY: display is open.
    let (argb, anim) = unsafe {
        (
            xcursor::XcursorSupportsARGB(conn.display()) != 0,
            xcursor::XcursorSupportsAnim(conn.display()) != 0,
        )
    };
    let mut caps = CursorCapabilities::ONE_BIT_TRANSPARENCY;
    if argb {
        caps |= CursorCapabilities::EIGHT_BIT_ALPHA;
    }
    if anim {
        caps |= CursorCapabilities::ANIMATION;
    }
    debug!("Native cursor capabilities: {:?}", caps);
    Ok(caps)
}

/// Closest cursor size the server supports to `width` x `height`; the
/// smaller side of the answer.
pub fn best_size(conn: &Connection, width: c_uint, height: c_uint) -> u32 {
    if !conn.is_open() {
        warn!("Cursor size query without an open display; reporting 0.");
        return 0;
    }
    let (mut best_width, mut best_height): (c_uint, c_uint) = (0, 0);
    // SAFETY: display is open; out-pointers are valid locals.
    let status = unsafe {
        xlib::XQueryBestCursor(
            conn.display(),
            conn.root(),
            width,
            height,
            &mut best_width,
            &mut best_height,
        )
    };
    if status == 0 {
        warn!("XQueryBestCursor failed; reporting 0.");
        return 0;
    }
    best_width.min(best_height)
}

pub fn min_size(conn: &Connection) -> u32 {
    best_size(conn, 1, 1)
}

pub fn max_size(conn: &Connection) -> u32 {
    best_size(conn, LARGEST_CURSOR_QUERY, LARGEST_CURSOR_QUERY)
}

fn dim(value: u32) -> Result<c_int> {
    c_int::try_from(value).map_err(|e| DisplayError::InvalidArgument(e.to_string()))
}

/// Builds a (possibly animated) cursor from validated ARGB frames.
pub fn create(conn: &Connection, image: &CursorImage<'_>) -> Result<xlib::Cursor> {
    require_open(conn)?;
    let (width, height) = (dim(image.width)?, dim(image.height)?);
    let frames = dim(image.num_images)?;

    // SAFETY: display is open. Every frame allocated here is owned by
    // `images`, which is destroyed exactly once below.
    unsafe {
        let images = xcursor::XcursorImagesCreate(frames);
        if images.is_null() {
            return Err(DisplayError::platform("XcursorImagesCreate", "allocation failed"));
        }
        for index in 0..image.num_images as usize {
            let frame = xcursor::XcursorImageCreate(width, height);
            if frame.is_null() {
                xcursor::XcursorImagesDestroy(images);
                return Err(DisplayError::platform("XcursorImageCreate", "allocation failed"));
            }
            (*frame).xhot = image.x_hotspot;
            (*frame).yhot = image.y_hotspot;
            (*frame).delay = image.delay(index);
            let pixels = image.frame(index);
            std::ptr::copy_nonoverlapping(pixels.as_ptr(), (*frame).pixels, pixels.len());
            *(*images).images.add(index) = frame;
            (*images).nimage += 1;
        }
        let cursor = xcursor::XcursorImagesLoadCursor(conn.display(), images);
        xcursor::XcursorImagesDestroy(images);
        if cursor == 0 {
            return Err(DisplayError::platform(
                "XcursorImagesLoadCursor",
                "server refused cursor",
            ));
        }
        trace!("Xcursor {:#x} loaded from {} frames", cursor, frames);
        Ok(cursor)
    }
}

pub fn destroy(conn: &Connection, cursor: xlib::Cursor) {
    if !conn.is_open() {
        warn!("Cursor {:#x} outlived its display; not freed.", cursor);
        return;
    }
    // SAFETY: display is open and the cursor belongs to it.
    unsafe {
        xlib::XFreeCursor(conn.display(), cursor);
    }
}

/// A fully transparent 1x1 cursor, used while the pointer is grabbed.
pub fn create_invisible(conn: &Connection, window: xlib::Window) -> Option<xlib::Cursor> {
    // SAFETY: display is open and `window` belongs to it.
    unsafe {
        let mut color: xlib::XColor = mem::zeroed();
        let color_ptr: *mut xlib::XColor = &mut color;
        let pixmap = xlib::XCreatePixmap(conn.display(), window, 1, 1, 1);
        if pixmap == 0 {
            warn!("Failed to create 1x1 pixmap for invisible cursor.");
            return None;
        }
        let cursor =
            xlib::XCreatePixmapCursor(conn.display(), pixmap, pixmap, color_ptr, color_ptr, 0, 0);
        xlib::XFreePixmap(conn.display(), pixmap);
        if cursor == 0 {
            warn!("Failed to create invisible pixmap cursor.");
            None
        } else {
            Some(cursor)
        }
    }
}
