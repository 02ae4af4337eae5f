// src/testing/mod.rs

//! Test doubles for the display backend.
//!
//! [`CountingLock`] stands in for the toolkit lock and counts acquisitions.
//! [`Recorder`] hands out [`RecordingBindings`] and a [`RecordingLoader`]
//! that log every native call, together with whether the lock was held at
//! the time, and can be told to fail, panic or stall on a given call.

mod counting_lock;
mod recording;

pub use counting_lock::CountingLock;
pub use recording::{NativeCall, Recorder, RecordingBindings, RecordingLoader};
