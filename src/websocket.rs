//! Live websocket broadcast of decoded samples
//!
//! Every client gets its own [`ClientBroadcaster`] with a private queue from
//! the [`Fanout`]. The broadcaster decodes each transmission, serializes the
//! samples as one JSON array and sends it as a text message. Nothing sent by
//! the client is read.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{Sink, SinkExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::decoders::DecoderRegistry;
use crate::fanout::{ConsumerQueue, Fanout};
use crate::{BridgeError, Result};

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts websocket clients and spawns a broadcaster per connection
#[derive(Debug)]
pub struct WebSocketServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl WebSocketServer {
    /// Bind the listening socket
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Bind`] if the address is taken or not
    /// available. This is fatal at startup.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener =
            TcpListener::bind(addr).await.map_err(|source| BridgeError::Bind { addr, source })?;
        let addr = listener.local_addr().map_err(|source| BridgeError::Bind { addr, source })?;
        info!("WebSocket server bound to {}", addr);
        Ok(Self { listener, addr })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Accept clients until cancelled.
    ///
    /// Any request path is accepted. A failed handshake or a client that
    /// goes away only ends that client's task.
    pub async fn run(self, fanout: Fanout, registry: DecoderRegistry, cancel: CancellationToken) -> Result<()> {
        info!("Accepting websocket clients on ws://{}", self.addr);

        loop {
            let (stream, peer) = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("WebSocket server cancelled");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        if pause_after_accept_error(&cancel).await {
                            continue;
                        }
                        info!("WebSocket server cancelled");
                        break;
                    }
                },
            };

            debug!("TCP connection from {}", peer);
            tokio::spawn(serve_client(stream, peer, fanout.clone(), registry, cancel.child_token()));
        }

        Ok(())
    }
}

/// Wait before the next accept. Returns `false` if cancelled meanwhile.
async fn pause_after_accept_error(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_RETRY_DELAY) => true,
    }
}

async fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    fanout: Fanout,
    registry: DecoderRegistry,
    cancel: CancellationToken,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    info!("Client {} connected", peer);
    let broadcaster = ClientBroadcaster::new(peer.to_string(), fanout.subscribe(), registry, cancel);

    match broadcaster.run(ws).await {
        Ok(sent) => info!("Client {} finished after {} message(s)", peer, sent),
        Err(e) => info!("Client {} disconnected: {}", peer, e),
    }
}

/// Delivery loop for one websocket client
pub struct ClientBroadcaster {
    peer: String,
    queue: ConsumerQueue,
    registry: DecoderRegistry,
    cancel: CancellationToken,
}

impl ClientBroadcaster {
    /// Create a broadcaster draining `queue` for `peer`
    pub fn new(peer: impl Into<String>, queue: ConsumerQueue, registry: DecoderRegistry, cancel: CancellationToken) -> Self {
        Self { peer: peer.into(), queue, registry, cancel }
    }

    /// Peer label used in logs and errors
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Send decoded samples until the queue closes or the client is cancelled.
    ///
    /// Transmissions that decode to nothing are skipped. Returns the number
    /// of messages sent.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Consumer`] when a send fails. The queue is
    /// dropped with `self`, so the fanout prunes it on its next publish.
    pub async fn run<W>(mut self, mut ws: W) -> Result<u64>
    where
        W: Sink<Message> + Unpin,
        W::Error: std::error::Error + Send + Sync + 'static,
    {
        let mut sent = 0u64;

        loop {
            let transmission = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.queue.recv() => match next {
                    Some(transmission) => transmission,
                    None => break,
                },
            };

            let samples = self.registry.decode_transmission(&transmission);
            if samples.is_empty() {
                trace!(
                    "Transmission {} ({}) has no samples for {}",
                    transmission.transmission_number(),
                    transmission.kind(),
                    self.peer
                );
                continue;
            }

            let json = serde_json::to_string(&samples)
                .map_err(|e| BridgeError::consumer(self.peer.clone(), Box::new(e)))?;

            ws.send(Message::Text(json.into()))
                .await
                .map_err(|e| BridgeError::consumer(self.peer.clone(), Box::new(e)))?;
            sent += 1;
        }

        // Best effort; the peer may already be gone
        let _ = ws.close().await;
        Ok(sent)
    }
}
