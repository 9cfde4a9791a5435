//! Phoenix synchronization crate.
//!
//! Owns everything between the hub socket and the render thread:
//! - `Triangle` / `Stride`: the shared geometry model
//! - `GeometryCodec`: JSON float-array wire format
//! - `TriangleStore`: canonical deduplicated triangle set
//! - `SyncClient` / `Inbound`: the WebSocket halves
//! - `SyncSession`: heartbeat publish + inbound drain tasks
//!
//! Nothing here touches the GPU. The render thread learns about changes via
//! `SessionEvent`s and pulls a `TriangleStore::snapshot` when it rebuilds.

mod client;
mod codec;
mod config;
mod error;
mod policy;
mod session;
mod store;
mod triangle;

pub use client::{Inbound, Publish, SyncClient};
pub use codec::GeometryCodec;
pub use config::SyncConfig;
pub use error::{ConnectionError, DecodeError, Direction, GeometryError};
pub use policy::{LocalTriangles, PublishPolicy};
pub use session::{SessionEvent, SyncSession};
pub use store::TriangleStore;
pub use triangle::{Stride, Triangle, VERTICES_PER_TRIANGLE};
