//! Phoenix engine crate.
//!
//! Platform + GPU runtime for the canvas client: one winit window, one wgpu
//! surface, and the triangle renderer that projects geometry into GPU buffers.
//! Knows nothing about the network; callers hand it flat float slices.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod paint;
pub mod render;
pub mod time;
pub mod window;
