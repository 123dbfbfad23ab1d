//! Duplex connection to the backend's chat endpoint.
//!
//! [`WebSocketTransport`] holds at most one live WebSocket. Outbound frames
//! are queued to a pump task that owns the socket; inbound text frames are
//! parsed and handed to the [`MessageRouter`]. State changes are published
//! both to router state handlers and through a `watch` channel.
//!
//! Sending is best-effort: a send while not open is dropped with a warning.
//! Connection failures and unexpected closes are logged and never retried
//! here; calling [`Transport::connect`] again is up to the caller.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::error::{ChatError, ChatResult};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::router::{MessageRouter, Subscription};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long `disconnect` waits for the close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Open,
    #[default]
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// A duplex frame transport with handler fan-out.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the connection. No-op if already connecting or open.
    async fn connect(&self) -> ChatResult<()>;

    /// Queue a frame. Returns `false`, after logging, when not open.
    fn send(&self, message: &OutboundMessage) -> bool;

    /// Close and release the connection.
    async fn disconnect(&self);

    /// Current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Router inbound frames and state changes go through.
    fn router(&self) -> &MessageRouter;

    /// Register a handler for inbound frames.
    fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
        Self: Sized,
    {
        self.router().on_message(handler)
    }

    /// Register a handler for state changes.
    fn on_state_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
        Self: Sized,
    {
        self.router().on_state_change(handler)
    }
}

/// State shared between the transport and its pump task.
struct Shared {
    router: MessageRouter,
    state: watch::Sender<ConnectionState>,
    /// Bumped by every connect attempt and every disconnect
    epoch: AtomicU64,
}

impl Shared {
    /// Move to `to`, notifying handlers only on an actual change.
    fn transition(&self, to: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == to {
                false
            } else {
                *current = to;
                true
            }
        });
        if changed {
            debug!("Connection state -> {}", to);
            self.router.notify_state(to);
        }
        changed
    }

    /// Move `from -> to` only if the state is still `from`.
    fn advance(&self, from: ConnectionState, to: ConnectionState) -> bool {
        let advanced = self.state.send_if_modified(|current| {
            if *current == from {
                *current = to;
                true
            } else {
                false
            }
        });
        if advanced {
            debug!("Connection state -> {}", to);
            self.router.notify_state(to);
        }
        advanced
    }

    /// Claim the right to connect: `Closed -> Connecting`. Returns the
    /// attempt's epoch.
    fn begin_connect(&self) -> Option<u64> {
        if self.advance(ConnectionState::Closed, ConnectionState::Connecting) {
            Some(self.epoch.fetch_add(1, Ordering::SeqCst) + 1)
        } else {
            None
        }
    }

    /// Whether nothing has connected or disconnected since `epoch`.
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }
}

struct Link {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

/// WebSocket transport to a fixed backend address.
pub struct WebSocketTransport {
    url: String,
    shared: Arc<Shared>,
    link: Mutex<Option<Link>>,
}

impl WebSocketTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Closed);
        Self {
            url: url.into(),
            shared: Arc::new(Shared {
                router: MessageRouter::new(),
                state,
                epoch: AtomicU64::new(0),
            }),
            link: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self) -> ChatResult<()> {
        let Some(epoch) = self.shared.begin_connect() else {
            debug!("Connect ignored, connection is {}", self.state());
            return Ok(());
        };

        info!("Connecting to {}", self.url);
        let ws = match connect_async(self.url.as_str()).await {
            Ok((ws, _response)) => ws,
            Err(e) => {
                error!("WebSocket connection to {} failed: {}", self.url, e);
                if self.shared.is_current(epoch) {
                    self.shared.transition(ConnectionState::Closed);
                }
                return Err(ChatError::Connect {
                    url: self.url.clone(),
                    message: e.to_string(),
                });
            }
        };

        if !self.shared.is_current(epoch) {
            info!("Disconnected while connecting; dropping new WebSocket");
            let mut ws = ws;
            let _ = ws.close(None).await;
            return Ok(());
        }

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(ws, outbound_rx, Arc::clone(&self.shared)));
        let stale = self.link.lock().replace(Link { outbound, task });
        if let Some(stale) = stale {
            stale.task.abort();
        }

        // The link is in place before anyone hears about `Open`. A server
        // close that already ran leaves the state `Closed`.
        if self.shared.advance(ConnectionState::Connecting, ConnectionState::Open) {
            info!("WebSocket connected");
        } else {
            debug!("Connection closed before it was reported open");
        }
        Ok(())
    }

    fn send(&self, message: &OutboundMessage) -> bool {
        if self.state() != ConnectionState::Open {
            warn!("WebSocket is not connected; dropping outbound message");
            return false;
        }

        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize outbound message: {}", e);
                return false;
            }
        };

        let queued = self
            .link
            .lock()
            .as_ref()
            .map(|link| link.outbound.send(text).is_ok())
            .unwrap_or(false);
        if !queued {
            warn!("WebSocket is not connected; dropping outbound message");
        }
        queued
    }

    async fn disconnect(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        let link = self.link.lock().take();
        if let Some(Link { outbound, task }) = link {
            // Closing the queue tells the pump to send a close frame and exit.
            drop(outbound);
            let abort = task.abort_handle();
            if tokio::time::timeout(CLOSE_GRACE, task).await.is_err() {
                warn!("WebSocket close handshake timed out");
                abort.abort();
            }
        }
        self.shared.transition(ConnectionState::Closed);
    }

    fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    fn router(&self) -> &MessageRouter {
        &self.shared.router
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.task.abort();
        }
    }
}

/// Owns the socket: writes queued frames, routes inbound ones.
async fn pump(ws: WsStream, mut outbound: mpsc::UnboundedReceiver<String>, shared: Arc<Shared>) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            queued = outbound.recv() => match queued {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
                None => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = shared.router.route_raw(text.as_str());
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket closed by server");
                    break;
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Dropping binary WebSocket frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            },
        }
    }

    shared.transition(ConnectionState::Closed);
    info!("WebSocket disconnected");
}
