// src/display/mode.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fullscreen video mode: resolution, colour depth and refresh rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Refresh rate in Hz, 0 when unknown.
    pub frequency: u32,
}

impl DisplayMode {
    pub fn new(width: u32, height: u32, bits_per_pixel: u32, frequency: u32) -> Self {
        Self {
            width,
            height,
            bits_per_pixel,
            frequency,
        }
    }

    /// True when both modes describe the same resolution.
    pub fn same_size(&self, other: &DisplayMode) -> bool {
        self.width == other.width && self.height == other.height
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} x {} x {} @{}Hz",
            self.width, self.height, self.bits_per_pixel, self.frequency
        )
    }
}
