use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::{Inbound, Publish, SyncClient};
use crate::codec::GeometryCodec;
use crate::config::SyncConfig;
use crate::error::ConnectionError;
use crate::policy::LocalTriangles;
use crate::store::TriangleStore;
use crate::triangle::Triangle;

/// Notification from the sync tasks to the render task.
#[derive(Debug)]
pub enum SessionEvent {
    /// One triangle was appended to the store.
    StoreChanged,
    /// The connection is gone; no further events follow from the failing task.
    Failed(ConnectionError),
}

/// Running synchronization: heartbeat publisher, inbound drain and writer
/// watchdog, all on the tokio runtime.
///
/// None of these tasks touch GPU state. They mutate the `TriangleStore` and
/// report through [`SyncSession::events`], which the render task drains once
/// per frame.
pub struct SyncSession {
    client: Arc<SyncClient>,
    events: flume::Receiver<SessionEvent>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncSession {
    /// Connects to the hub described by `config` and starts the session tasks.
    pub async fn connect(
        config: &SyncConfig,
        store: Arc<TriangleStore>,
        local: Arc<LocalTriangles>,
    ) -> Result<Self, ConnectionError> {
        let codec = GeometryCodec::new(config.stride);
        let (client, inbound) = SyncClient::connect(&config.endpoint(), codec).await?;
        Ok(Self::start(client, inbound, store, local, config.publish_period))
    }

    /// Starts the session tasks over an established connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        client: SyncClient,
        inbound: Inbound,
        store: Arc<TriangleStore>,
        local: Arc<LocalTriangles>,
        publish_period: Duration,
    ) -> Self {
        let client = Arc::new(client);
        let (events_tx, events_rx) = flume::unbounded();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(run_heartbeat(
                Arc::clone(&client),
                local,
                publish_period,
                shutdown_rx.clone(),
                events_tx.clone(),
            )),
            tokio::spawn(run_drain(
                inbound,
                store,
                shutdown_rx.clone(),
                events_tx.clone(),
            )),
            tokio::spawn(run_watchdog(Arc::clone(&client), shutdown_rx, events_tx)),
        ];

        Self {
            client,
            events: events_rx,
            shutdown: shutdown_tx,
            tasks,
        }
    }

    #[inline]
    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Sends `triangle` immediately, outside the heartbeat.
    pub fn publish(&self, triangle: &Triangle) -> Result<(), ConnectionError> {
        self.client.publish(triangle)
    }

    /// Events that arrived since the last call. Never blocks.
    pub fn events(&self) -> flume::TryIter<'_, SessionEvent> {
        self.events.try_iter()
    }

    /// Stops all tasks, then closes the connection.
    ///
    /// A read blocked on the socket is abandoned rather than awaited.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);

        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                log::warn!("sync task ended abnormally: {e}");
            }
        }

        self.client.close().await;
        log::info!("sync session with {} closed", self.client.endpoint());
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Re-announces the local triangles every `period`, starting one period after
/// the call. Sends whatever the publish policy selects, changed or not.
pub(crate) async fn run_heartbeat<P: Publish>(
    publisher: Arc<P>,
    local: Arc<LocalTriangles>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    events: flume::Sender<SessionEvent>,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let batch = local.to_publish();
                for triangle in &batch {
                    if let Err(err) = publisher.publish(triangle) {
                        log::error!("{err}");
                        let _ = events.send(SessionEvent::Failed(err));
                        return;
                    }
                }
                log::debug!("heartbeat: published {} triangle(s)", batch.len());
            }
        }
    }
}

/// Reads until the connection fails, merging every decoded triangle.
///
/// No timer is involved: the next read starts as soon as the previous one
/// completes, so a fast peer is drained as fast as it sends.
async fn run_drain(
    mut inbound: Inbound,
    store: Arc<TriangleStore>,
    mut shutdown: watch::Receiver<bool>,
    events: flume::Sender<SessionEvent>,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = inbound.recv() => match received {
                Ok(triangle) => {
                    if store.merge_if_new(triangle) {
                        log::debug!("merged remote triangle ({} known)", store.len());
                        if events.send(SessionEvent::StoreChanged).is_err() {
                            break;
                        }
                    }
                }
                Err(err) => {
                    log::error!("{err}");
                    let _ = events.send(SessionEvent::Failed(err));
                    break;
                }
            }
        }
    }
}

async fn run_watchdog(
    client: Arc<SyncClient>,
    mut shutdown: watch::Receiver<bool>,
    events: flume::Sender<SessionEvent>,
) {
    tokio::select! {
        biased;
        _ = shutdown.changed() => {}
        err = client.failed() => {
            let _ = events.send(SessionEvent::Failed(err));
        }
    }
}
