// src/lib.rs

//! Linux (X11/GLX) display backend.
//!
//! [`LinuxDisplay`] wraps every native windowing call in one process-wide
//! toolkit lock, keeps the X display connection open exactly as long as
//! something uses it, and loads libGL only while GL peers exist. Native work
//! is delegated to [`NativeBindings`]; [`platform::backends::x11`] provides
//! the Xlib implementation and [`testing`] a recording one.

pub mod config;
pub mod display;
pub mod error;
pub mod keys;
pub mod platform;
pub mod testing;

pub use display::DisplayImplementation;
pub use error::{DisplayError, Result};
pub use platform::{GlLibrary, LinuxDisplay, NativeBindings, ToolkitLock, X11Display};
