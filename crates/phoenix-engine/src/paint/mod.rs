//! Color model shared by the renderer and the frame clear.

pub mod color;

pub use color::Color;
