// src/platform/library.rs
//
// Loading of the OpenGL driver library. GL peers need GLX entry points,
// which live in libGL; the library is opened when the first peer is created
// and closed again when the last one is destroyed.

use crate::error::{DisplayError, Result};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use x11_dl::glx::Glx;

/// A reference-counted native library.
pub trait GlLibrary: Send {
    /// Takes a reference, loading the library on the first one.
    fn load(&mut self) -> Result<()>;
    /// Drops a reference, unloading the library with the last one.
    fn unload(&mut self);
}

/// GLX function table resolved from libGL.
pub struct LoadedGlx(Glx);

// SAFETY: the table is plain function pointers plus the library handle; the
// functions themselves are only called with the toolkit lock held.
unsafe impl Send for LoadedGlx {}

impl LoadedGlx {
    /// Opens libGL and resolves the GLX entry points.
    pub fn open() -> Result<Self> {
        Glx::open()
            .map(LoadedGlx)
            .map_err(|e| DisplayError::LibraryLoad(e.to_string()))
    }
}

impl std::ops::Deref for LoadedGlx {
    type Target = Glx;

    fn deref(&self) -> &Glx {
        &self.0
    }
}

/// Slot shared between [`GlxLoader`] and the native bindings that need GLX.
#[derive(Clone, Default)]
pub struct SharedGlx(Arc<Mutex<Option<LoadedGlx>>>);

impl SharedGlx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the slot. `None` inside means libGL is not currently loaded.
    pub fn lock(&self) -> MutexGuard<'_, Option<LoadedGlx>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().is_some()
    }
}

/// Loads libGL through `x11-dl` on demand.
pub struct GlxLoader {
    refs: usize,
    slot: SharedGlx,
}

impl GlxLoader {
    pub fn new(slot: SharedGlx) -> Self {
        Self { refs: 0, slot }
    }

    pub fn references(&self) -> usize {
        self.refs
    }
}

impl GlLibrary for GlxLoader {
    fn load(&mut self) -> Result<()> {
        if self.refs == 0 {
            *self.slot.lock() = Some(LoadedGlx::open()?);
            info!("OpenGL library loaded.");
        }
        self.refs += 1;
        debug!("OpenGL library references: {}", self.refs);
        Ok(())
    }

    fn unload(&mut self) {
        match self.refs {
            0 => warn!("OpenGL library unloaded more often than loaded; ignoring."),
            1 => {
                self.refs = 0;
                self.slot.lock().take();
                info!("OpenGL library unloaded.");
            }
            _ => {
                self.refs -= 1;
                debug!("OpenGL library references: {}", self.refs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unload_without_load_is_ignored() {
        let slot = SharedGlx::new();
        let mut loader = GlxLoader::new(slot.clone());
        loader.unload();
        assert_eq!(loader.references(), 0);
        assert!(!slot.is_loaded());
    }
}
