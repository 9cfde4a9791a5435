use std::time::Duration;

use clap::{Parser, ValueEnum};

use phoenix_engine::render::VertexFormat;
use phoenix_sync::{PublishPolicy, Stride, SyncConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "phoenix", version, about = "Shared triangle canvas client")]
pub struct Cli {
    /// Hub address as host:port.
    #[arg(long, default_value = "localhost:8080")]
    pub addr: String,

    /// WebSocket path on the hub.
    #[arg(long, default_value = "/ws")]
    pub path: String,

    /// Vertex layout shared by every client of the hub.
    #[arg(long, value_enum, default_value_t = VertexArg::Position)]
    pub vertex: VertexArg,

    /// Heartbeat period in milliseconds.
    #[arg(long = "publish-ms", default_value_t = 2000)]
    pub publish_ms: u64,

    /// Which local triangles each heartbeat re-sends.
    #[arg(long, value_enum, default_value_t = PolicyArg::Signature)]
    pub publish: PolicyArg,

    /// Start with an empty canvas instead of the local triangle.
    #[arg(long)]
    pub no_seed: bool,

    /// Log filter, e.g. `debug` or `phoenix_sync=trace`. Overrides RUST_LOG.
    #[arg(long)]
    pub log: Option<String>,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexArg {
    Position,
    PositionColor,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum PolicyArg {
    Signature,
    AllLocal,
}

impl Cli {
    pub fn stride(&self) -> Stride {
        match self.vertex {
            VertexArg::Position => Stride::Position,
            VertexArg::PositionColor => Stride::PositionColor,
        }
    }

    pub fn vertex_format(&self) -> VertexFormat {
        vertex_format_for(self.stride())
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            addr: self.addr.clone(),
            path: self.path.clone(),
            stride: self.stride(),
            publish_period: Duration::from_millis(self.publish_ms),
            policy: match self.publish {
                PolicyArg::Signature => PublishPolicy::Signature,
                PolicyArg::AllLocal => PublishPolicy::AllLocal,
            },
        }
    }
}

pub fn vertex_format_for(stride: Stride) -> VertexFormat {
    match stride {
        Stride::Position => VertexFormat::Position,
        Stride::PositionColor => VertexFormat::PositionColor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_hub() {
        let cli = Cli::try_parse_from(["phoenix"]).unwrap();
        let config = cli.sync_config();

        assert_eq!(config.endpoint(), "ws://localhost:8080/ws");
        assert_eq!(config.stride, Stride::Position);
        assert_eq!(config.publish_period, Duration::from_secs(2));
        assert_eq!(config.policy, PublishPolicy::Signature);
        assert_eq!(cli.vertex_format(), VertexFormat::Position);
        assert!(!cli.no_seed);
    }

    #[test]
    fn flags_are_mapped() {
        let cli = Cli::try_parse_from([
            "phoenix",
            "--addr",
            "10.0.0.2:9000",
            "--vertex",
            "position-color",
            "--publish-ms",
            "250",
            "--publish",
            "all-local",
            "--no-seed",
        ])
        .unwrap();
        let config = cli.sync_config();

        assert_eq!(config.endpoint(), "ws://10.0.0.2:9000/ws");
        assert_eq!(config.stride, Stride::PositionColor);
        assert_eq!(config.publish_period, Duration::from_millis(250));
        assert_eq!(config.policy, PublishPolicy::AllLocal);
        assert_eq!(cli.vertex_format(), VertexFormat::PositionColor);
        assert!(cli.no_seed);
    }

    #[test]
    fn unknown_vertex_layout_is_rejected() {
        assert!(Cli::try_parse_from(["phoenix", "--vertex", "uv"]).is_err());
    }

    #[test]
    fn stride_and_format_agree() {
        for stride in [Stride::Position, Stride::PositionColor] {
            assert_eq!(vertex_format_for(stride).floats_per_vertex(), stride.floats());
        }
    }
}
