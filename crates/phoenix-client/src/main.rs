//! Phoenix: a client for a shared triangle canvas.
//!
//! Publishes its own triangle to a WebSocket hub every heartbeat, merges what
//! other clients publish, and draws the union every frame.

mod canvas;
mod cli;
mod lifecycle;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use phoenix_engine::device::GpuInit;
use phoenix_engine::logging::{LoggingConfig, init_logging};
use phoenix_engine::render::TriangleRenderer;
use phoenix_engine::window::{Runtime, RuntimeConfig};
use phoenix_sync::{LocalTriangles, SyncSession, Triangle, TriangleStore};

use crate::canvas::{Canvas, FILL};
use crate::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(LoggingConfig {
        env_filter: cli.log.clone(),
        ..LoggingConfig::default()
    });

    let config = cli.sync_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("phoenix-sync")
        .build()
        .context("failed to start the sync runtime")?;

    let signature = Triangle::random(&mut rand::thread_rng(), config.stride);
    log::info!("local triangle: {signature:?}");

    let store = Arc::new(if cli.no_seed {
        TriangleStore::new(config.stride)
    } else {
        TriangleStore::seeded(config.stride, signature.clone())
    });
    let local = Arc::new(LocalTriangles::new(signature, config.policy));

    let session = runtime
        .block_on(SyncSession::connect(&config, Arc::clone(&store), Arc::clone(&local)))
        .with_context(|| format!("cannot reach hub at {}", config.endpoint()))?;

    let renderer = TriangleRenderer::new(cli.vertex_format(), FILL);
    let canvas = Canvas::new(runtime, session, store, local, renderer);

    Runtime::run(RuntimeConfig::default(), GpuInit::default(), canvas)
}
