// src/display/peer.rs
//! Owned handles to native resources.
//!
//! Each value here is returned by a backend `create_*` operation and must be
//! handed back to the matching `destroy_*` operation, which consumes it. The
//! peers hold a display usage and a GL library reference while alive; dropping
//! one without destroying it leaks both, which is logged.

use super::caps::CURSOR_HANDLE_SIZE;
use super::pixel_format::PixelFormat;
use crate::error::{DisplayError, Result};
use libc::c_int;
use log::warn;

/// Opaque identifier the native bindings use to find their side of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle(u64);

impl PeerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// The on-screen GL surface description a window is created from.
#[derive(Debug)]
pub struct DisplayPeer {
    handle: PeerHandle,
    pixel_format: PixelFormat,
    released: bool,
}

impl DisplayPeer {
    pub(crate) fn new(handle: PeerHandle, pixel_format: PixelFormat) -> Self {
        Self {
            handle,
            pixel_format,
            released: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> PeerHandle {
        self.handle
    }

    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    /// Marks the peer as destroyed and yields its native handle.
    pub(crate) fn release(mut self) -> PeerHandle {
        self.released = true;
        self.handle
    }
}

impl Drop for DisplayPeer {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "DisplayPeer {:?} dropped without destroy_peer_info; its display usage is leaked.",
                self.handle
            );
        }
    }
}

/// An off-screen GL surface.
#[derive(Debug)]
pub struct PbufferPeer {
    handle: PeerHandle,
    width: u32,
    height: u32,
    pixel_format: PixelFormat,
    released: bool,
}

impl PbufferPeer {
    pub(crate) fn new(handle: PeerHandle, width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            handle,
            width,
            height,
            pixel_format,
            released: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> PeerHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_format(&self) -> &PixelFormat {
        &self.pixel_format
    }

    pub(crate) fn release(mut self) -> PeerHandle {
        self.released = true;
        self.handle
    }
}

impl Drop for PbufferPeer {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                "PbufferPeer {:?} dropped without destroy_pbuffer; its display usage is leaked.",
                self.handle
            );
        }
    }
}

/// Fixed-size storage the native cursor constructor writes its handle into.
#[derive(Debug, PartialEq, Eq)]
pub struct CursorHandle([u8; CURSOR_HANDLE_SIZE]);

impl CursorHandle {
    pub(crate) fn zeroed() -> Self {
        Self([0; CURSOR_HANDLE_SIZE])
    }

    pub fn as_bytes(&self) -> &[u8; CURSOR_HANDLE_SIZE] {
        &self.0
    }

    /// Stores a native id in the handle.
    pub fn store_id(&mut self, id: u64) {
        self.0 = id.to_ne_bytes();
    }

    /// Reads back the native id stored by [`CursorHandle::store_id`].
    pub fn id(&self) -> u64 {
        u64::from_ne_bytes(self.0)
    }
}

/// ARGB image data for a native cursor.
///
/// `images` holds `num_images` frames of `width * height` pixels each, frame
/// after frame. `delays`, when present, holds one delay in milliseconds per
/// frame.
#[derive(Debug, Clone, Copy)]
pub struct CursorImage<'a> {
    pub width: u32,
    pub height: u32,
    pub x_hotspot: u32,
    pub y_hotspot: u32,
    pub num_images: u32,
    pub images: &'a [u32],
    pub delays: Option<&'a [u32]>,
}

impl<'a> CursorImage<'a> {
    /// A single-frame cursor.
    pub fn still(width: u32, height: u32, x_hotspot: u32, y_hotspot: u32, pixels: &'a [u32]) -> Self {
        Self {
            width,
            height,
            x_hotspot,
            y_hotspot,
            num_images: 1,
            images: pixels,
            delays: None,
        }
    }

    /// Saturates for dimensions that [`CursorImage::validate`] rejects.
    pub fn pixels_per_frame(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Pixels of frame `index`.
    pub fn frame(&self, index: usize) -> &'a [u32] {
        let len = self.pixels_per_frame();
        &self.images[index * len..(index + 1) * len]
    }

    /// Delay of frame `index`, 0 when no delays were given.
    pub fn delay(&self, index: usize) -> u32 {
        self.delays
            .and_then(|delays| delays.get(index).copied())
            .unwrap_or(0)
    }

    /// Checks the buffers against the declared dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.num_images == 0 {
            return Err(DisplayError::InvalidArgument(format!(
                "cursor must have non-zero size and at least one image (got {}x{}, {} images)",
                self.width, self.height, self.num_images
            )));
        }
        if c_int::try_from(self.width).is_err() || c_int::try_from(self.height).is_err() {
            return Err(DisplayError::InvalidArgument(format!(
                "cursor size {}x{} exceeds the native limit",
                self.width, self.height
            )));
        }
        if self.x_hotspot >= self.width || self.y_hotspot >= self.height {
            return Err(DisplayError::InvalidArgument(format!(
                "cursor hotspot ({}, {}) outside {}x{} image",
                self.x_hotspot, self.y_hotspot, self.width, self.height
            )));
        }
        let needed = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(self.num_images as usize))
            .ok_or_else(|| {
                DisplayError::InvalidArgument(format!(
                    "cursor of {}x{} with {} images is too large",
                    self.width, self.height, self.num_images
                ))
            })?;
        if self.images.len() < needed {
            return Err(DisplayError::InvalidArgument(format!(
                "cursor needs {} pixels, got {}",
                needed,
                self.images.len()
            )));
        }
        if let Some(delays) = self.delays {
            if delays.len() < self.num_images as usize {
                return Err(DisplayError::InvalidArgument(format!(
                    "cursor needs {} delays, got {}",
                    self.num_images,
                    delays.len()
                )));
            }
        }
        Ok(())
    }
}
