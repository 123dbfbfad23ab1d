//! Mock transport for testing.
//!
//! Records outbound frames and lets tests drive inbound frames and
//! connection events by hand, without a socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ChatResult;
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::router::MessageRouter;
use crate::transport::{ConnectionState, Transport};

/// In-memory [`Transport`].
///
/// Clones share state, so a test can keep one handle while a session owns
/// another.
#[derive(Clone, Default)]
pub struct MockTransport {
    router: MessageRouter,
    state: Arc<RwLock<ConnectionState>>,
    /// Leave `connect` in `Connecting` until [`open`](Self::open) is called.
    hold_connecting: bool,
    sent: Arc<RwLock<Vec<OutboundMessage>>>,
    connects: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `connect` stop at `Connecting`.
    pub fn stay_connecting(mut self) -> Self {
        self.hold_connecting = true;
        self
    }

    /// Simulate the connection opening.
    pub fn open(&self) {
        self.set_state(ConnectionState::Open);
    }

    /// Simulate the server closing the connection.
    pub fn close(&self) {
        self.set_state(ConnectionState::Closed);
    }

    /// Deliver a frame to registered handlers.
    pub fn deliver(&self, message: &InboundMessage) {
        self.router.route(message);
    }

    /// Deliver a raw text frame, as received off the wire.
    pub fn deliver_raw(&self, raw: &str) -> Option<InboundMessage> {
        self.router.route_raw(raw)
    }

    /// Frames passed to `send` while open
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.read().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sent.read().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn set_state(&self, to: ConnectionState) {
        {
            let mut state = self.state.write();
            if *state == to {
                return;
            }
            *state = to;
        }
        self.router.notify_state(to);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> ChatResult<()> {
        if self.state() != ConnectionState::Closed {
            return Ok(());
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.set_state(ConnectionState::Connecting);
        if !self.hold_connecting {
            self.set_state(ConnectionState::Open);
        }
        Ok(())
    }

    fn send(&self, message: &OutboundMessage) -> bool {
        if self.state() != ConnectionState::Open {
            return false;
        }
        self.sent.write().push(message.clone());
        true
    }

    async fn disconnect(&self) {
        self.set_state(ConnectionState::Closed);
    }

    fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn router(&self) -> &MessageRouter {
        &self.router
    }
}
