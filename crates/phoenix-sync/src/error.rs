use std::fmt;

use tokio_tungstenite::tungstenite;

use crate::triangle::Stride;

/// A float sequence that cannot form a `Triangle`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("triangle has no values")]
    Empty,

    #[error("{len} values do not divide into vertices of {} floats", .stride.floats())]
    Misaligned { len: usize, stride: Stride },

    #[error("value {index} is not finite ({value})")]
    NonFinite { index: usize, value: f32 },
}

/// Inbound payload that could not be turned into a `Triangle`.
///
/// Fatal to the message, never to the session: the drain task logs and skips it.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not a JSON float array: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a valid triangle: {0}")]
    Geometry(#[from] GeometryError),
}

/// Which half of the duplex channel failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    Publish,
    Read,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Publish => f.write_str("publish"),
            Direction::Read => f.write_str("read"),
        }
    }
}

/// Failure of the hub connection. Always terminal for the session.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: tungstenite::Error,
    },

    #[error("{direction} failed: {source}")]
    Transport {
        direction: Direction,
        #[source]
        source: tungstenite::Error,
    },

    #[error("{direction} failed: hub closed the connection")]
    ClosedByPeer { direction: Direction },

    #[error("{direction} failed: channel already shut down")]
    Closed { direction: Direction },

    #[error("publish failed: cannot encode triangle: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl ConnectionError {
    /// Direction the failure was observed on, if it happened after connecting.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            ConnectionError::Connect { .. } => None,
            ConnectionError::Encode { .. } => Some(Direction::Publish),
            ConnectionError::Transport { direction, .. }
            | ConnectionError::ClosedByPeer { direction }
            | ConnectionError::Closed { direction } => Some(*direction),
        }
    }
}
