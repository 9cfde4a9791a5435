//! Core engine-facing contracts.
//!
//! The stable interface between the runtime (platform loop) and the
//! application: callbacks in [`App`], per-frame handles in [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
