use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::codec::GeometryCodec;
use crate::error::{ConnectionError, Direction};
use crate::triangle::Triangle;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Anything that can send a triangle to the hub without blocking the caller.
pub trait Publish {
    fn publish(&self, triangle: &Triangle) -> Result<(), ConnectionError>;
}

enum Outbound {
    Frame(String),
    Close,
}

/// Outbound half of the hub connection.
///
/// `publish` only enqueues; a single writer task owns the socket sink, so
/// concurrent publishers are serialized in enqueue order. The inbound half is
/// returned separately by `connect` as [`Inbound`].
pub struct SyncClient {
    endpoint: String,
    codec: GeometryCodec,
    outbound: flume::Sender<Outbound>,
    failure: flume::Receiver<ConnectionError>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl SyncClient {
    /// Opens the WebSocket and starts the writer task.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(
        endpoint: &str,
        codec: GeometryCodec,
    ) -> Result<(Self, Inbound), ConnectionError> {
        log::info!("connecting to {endpoint}");

        let (ws, _response) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|source| ConnectionError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        log::info!("connected to {endpoint}");

        let (sink, stream) = ws.split();
        let (outbound_tx, outbound_rx) = flume::unbounded();
        let (failure_tx, failure_rx) = flume::bounded(1);

        let writer = tokio::spawn(run_writer(sink, outbound_rx, failure_tx));

        let client = Self {
            endpoint: endpoint.to_string(),
            codec,
            outbound: outbound_tx,
            failure: failure_rx,
            writer: Mutex::new(Some(writer)),
        };

        let inbound = Inbound {
            stream,
            codec,
            finished: false,
        };

        Ok((client, inbound))
    }

    #[inline]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolves when the writer task hits a transport error.
    ///
    /// Never resolves if the connection is closed normally.
    pub async fn failed(&self) -> ConnectionError {
        match self.failure.recv_async().await {
            Ok(err) => err,
            Err(_) => std::future::pending().await,
        }
    }

    /// Sends a close frame after any queued triangles and waits for the writer
    /// task to finish. Idempotent.
    pub async fn close(&self) {
        let _ = self.outbound.send(Outbound::Close);

        let writer = self.writer.lock().take();
        if let Some(handle) = writer {
            if let Err(e) = handle.await {
                log::warn!("publish task ended abnormally: {e}");
            }
        }
    }
}

impl Publish for SyncClient {
    fn publish(&self, triangle: &Triangle) -> Result<(), ConnectionError> {
        let frame = self
            .codec
            .encode(triangle)
            .map_err(|source| ConnectionError::Encode { source })?;

        self.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| ConnectionError::Closed {
                direction: Direction::Publish,
            })
    }
}

async fn run_writer(
    mut sink: SplitSink<WsStream, Message>,
    outbound: flume::Receiver<Outbound>,
    failure: flume::Sender<ConnectionError>,
) {
    while let Ok(item) = outbound.recv_async().await {
        match item {
            Outbound::Frame(frame) => {
                if let Err(source) = sink.send(Message::text(frame)).await {
                    let err = ConnectionError::Transport {
                        direction: Direction::Publish,
                        source,
                    };
                    log::error!("{err}");
                    let _ = failure.try_send(err);
                    return;
                }
            }
            Outbound::Close => break,
        }
    }

    if let Err(e) = sink.close().await {
        log::debug!("closing hub connection: {e}");
    }
}

/// Inbound half of the hub connection: a lazy, unbounded stream of decoded
/// triangles.
///
/// Malformed payloads are logged and skipped. Any transport failure or close
/// from the hub ends the stream for good; only a new connection restarts it.
pub struct Inbound {
    stream: SplitStream<WsStream>,
    codec: GeometryCodec,
    finished: bool,
}

impl Inbound {
    /// Waits for the next valid triangle.
    ///
    /// Cancel-safe: dropping the future never loses a decoded triangle.
    pub async fn recv(&mut self) -> Result<Triangle, ConnectionError> {
        if self.finished {
            return Err(ConnectionError::Closed {
                direction: Direction::Read,
            });
        }

        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(source)) => {
                    self.finished = true;
                    return Err(ConnectionError::Transport {
                        direction: Direction::Read,
                        source,
                    });
                }
                None => {
                    self.finished = true;
                    return Err(ConnectionError::ClosedByPeer {
                        direction: Direction::Read,
                    });
                }
            };

            let payload: &[u8] = match &message {
                Message::Text(text) => text.as_bytes(),
                Message::Binary(bytes) => &bytes[..],
                Message::Close(frame) => {
                    log::info!("hub sent close: {frame:?}");
                    self.finished = true;
                    return Err(ConnectionError::ClosedByPeer {
                        direction: Direction::Read,
                    });
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            log::trace!("recv: {}", String::from_utf8_lossy(payload));

            match self.codec.decode(payload) {
                Ok(triangle) => return Ok(triangle),
                Err(e) => log::warn!("read: dropping message: {e}"),
            }
        }
    }
}
