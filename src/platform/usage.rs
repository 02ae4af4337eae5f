// src/platform/usage.rs

use crate::error::Result;
use log::{debug, warn};

/// Counts the live users of the native display connection.
///
/// The first acquire opens the connection and the last release closes it.
/// A failed open leaves the count untouched, and a release at zero is
/// ignored, so the count never goes negative.
#[derive(Debug, Default)]
pub struct DisplayUsage {
    count: usize,
}

impl DisplayUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Registers one more user, calling `open` on the 0 -> 1 transition.
    pub fn acquire(&mut self, open: impl FnOnce() -> Result<()>) -> Result<()> {
        if self.count == 0 {
            open()?;
            debug!("Native display connection opened.");
        }
        self.count += 1;
        debug!("Display usage incremented to {}", self.count);
        Ok(())
    }

    /// Drops one user, calling `close` on the 1 -> 0 transition.
    pub fn release(&mut self, close: impl FnOnce()) {
        match self.count {
            0 => warn!("Display usage released while already zero; ignoring."),
            1 => {
                self.count = 0;
                close();
                debug!("Display usage reached zero; native display connection closed.");
            }
            _ => {
                self.count -= 1;
                debug!("Display usage decremented to {}", self.count);
            }
        }
    }
}
