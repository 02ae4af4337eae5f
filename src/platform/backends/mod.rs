// src/platform/backends/mod.rs

//! Native binding implementations.

pub mod x11;
