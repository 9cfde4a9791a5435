//! GPU rendering subsystem.
//!
//! Geometry arrives as raw normalized-device-space floats; there is no
//! camera or viewport transform. Each renderer owns its GPU resources
//! (pipelines, buffers) and all of them must stay on the thread that owns
//! the device.

mod ctx;
mod error;
mod mesh;
mod triangles;

pub use ctx::{RenderCtx, RenderTarget};
pub use error::GpuResourceError;
pub use mesh::{MeshAllocator, MeshSet, VERTICES_PER_MESH, VertexFormat, padded_vertices};
pub use triangles::TriangleRenderer;
