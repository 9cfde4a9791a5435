use std::time::Duration;

use crate::policy::PublishPolicy;
use crate::triangle::Stride;

/// Synchronization settings for one session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hub address as `host:port`.
    pub addr: String,

    /// WebSocket path on the hub.
    pub path: String,

    /// Floats per vertex, shared by every client on the hub.
    pub stride: Stride,

    /// Heartbeat period for re-announcing local triangles.
    pub publish_period: Duration,

    pub policy: PublishPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            addr: "localhost:8080".to_string(),
            path: "/ws".to_string(),
            stride: Stride::Position,
            publish_period: Duration::from_secs(2),
            policy: PublishPolicy::Signature,
        }
    }
}

impl SyncConfig {
    /// Full `ws://` URL of the hub.
    pub fn endpoint(&self) -> String {
        let path = self.path.trim();
        if path.starts_with('/') {
            format!("ws://{}{}", self.addr, path)
        } else {
            format!("ws://{}/{}", self.addr, path)
        }
    }
}
