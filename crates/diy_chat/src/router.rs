//! Fan-out of inbound frames and connection state changes to handlers.
//!
//! Handlers are registered with a [`HandlerRegistry`] and stay registered
//! for exactly as long as the returned [`Subscription`] is alive. Delivery
//! is synchronous and in registration order. A handler that panics is
//! logged and skipped; the remaining handlers still receive the value.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, error, warn};

use crate::protocol::InboundMessage;
use crate::transport::ConnectionState;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    handlers: Vec<(u64, Handler<T>)>,
}

/// Ordered list of handlers for values of type `T`.
pub struct HandlerRegistry<T> {
    slots: Arc<RwLock<Slots<T>>>,
}

impl<T> Clone for HandlerRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> Default for HandlerRegistry<T> {
    fn default() -> Self {
        Self {
            slots: Arc::new(RwLock::new(Slots {
                next_id: 1,
                handlers: Vec::new(),
            })),
        }
    }
}

impl<T: 'static> HandlerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. It is removed when the subscription is dropped.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = self.slots.write();
            let id = slots.next_id;
            slots.next_id += 1;
            slots.handlers.push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<RwLock<Slots<T>>> = Arc::downgrade(&self.slots);
        Subscription {
            id,
            release: Some(Box::new(move || {
                if let Some(slots) = weak.upgrade() {
                    slots.write().handlers.retain(|(hid, _)| *hid != id);
                }
            })),
        }
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.slots.read().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a value to every handler, in registration order.
    ///
    /// Returns the number of handlers that panicked.
    pub fn dispatch(&self, value: &T) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<(u64, Handler<T>)> = self.slots.read().handlers.clone();

        let mut failures = 0;
        for (id, handler) in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(value))).is_err() {
                failures += 1;
                error!("Handler {} panicked; continuing with remaining handlers", id);
            }
        }
        failures
    }
}

/// Registration handle returned by `subscribe`.
///
/// Dropping it unregisters the handler.
pub struct Subscription {
    id: u64,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unregister now rather than at drop.
    pub fn unsubscribe(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Counters for routed traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Frames parsed and delivered
    pub frames_routed: u64,
    /// Frames dropped because they did not parse
    pub frames_dropped: u64,
    /// Handler invocations that panicked
    pub handler_failures: u64,
}

#[derive(Default)]
struct Counters {
    routed: AtomicU64,
    dropped: AtomicU64,
    failures: AtomicU64,
}

/// Routes inbound frames and state changes of one connection.
#[derive(Clone, Default)]
pub struct MessageRouter {
    messages: HandlerRegistry<InboundMessage>,
    states: HandlerRegistry<ConnectionState>,
    counters: Arc<Counters>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every parsed inbound frame.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.messages.subscribe(handler)
    }

    /// Register a handler for connection state changes.
    pub fn on_state_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.states.subscribe(handler)
    }

    pub fn message_handler_count(&self) -> usize {
        self.messages.len()
    }

    pub fn state_handler_count(&self) -> usize {
        self.states.len()
    }

    /// Deliver a parsed frame.
    pub fn route(&self, message: &InboundMessage) {
        debug!("Routing {} frame", message.kind);
        self.counters.routed.fetch_add(1, Ordering::Relaxed);
        let failures = self.messages.dispatch(message);
        self.counters.failures.fetch_add(failures as u64, Ordering::Relaxed);
    }

    /// Parse a raw text frame and deliver it.
    ///
    /// Frames that are not valid JSON are dropped and logged; handlers never
    /// see them.
    pub fn route_raw(&self, raw: &str) -> Option<InboundMessage> {
        match InboundMessage::from_json(raw) {
            Ok(message) => {
                self.route(&message);
                Some(message)
            }
            Err(e) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to parse WebSocket message: {}", e);
                None
            }
        }
    }

    /// Tell state handlers the connection changed state.
    pub fn notify_state(&self, state: ConnectionState) {
        let failures = self.states.dispatch(&state);
        self.counters.failures.fetch_add(failures as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            frames_routed: self.counters.routed.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
            handler_failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}
