// src/platform/mod.rs
//
// The Linux display backend and the native pieces it drives.

pub mod backends;
pub mod bindings;
pub mod library;
pub mod linux_display;
pub mod lock;
pub mod usage;

pub use bindings::NativeBindings;
pub use library::{GlLibrary, GlxLoader, SharedGlx};
pub use linux_display::LinuxDisplay;
pub use lock::{ProcessLock, ToolkitGuard, ToolkitLock, XDisplayLock};
pub use usage::DisplayUsage;

/// The backend wired to Xlib and a runtime-loaded libGL.
pub type X11Display = LinuxDisplay<backends::x11::XlibBindings, GlxLoader>;
