//! Session client for one chat view.
//!
//! The client owns one transport, keeps the view's transcript and tracks
//! whether the assistant is expected to reply:
//!
//! ```text
//!                 open                  send (non-empty)
//! Disconnected ─────────▶ ConnectedIdle ────────────────▶ AwaitingReply
//!      ▲                        ▲                              │
//!      │ close / teardown       └──────── ai_response ─────────┘
//!      └──────────────── (from any state)
//! ```
//!
//! User entries are appended optimistically when sent. Assistant entries are
//! appended for every `ai_response` frame, in arrival order. Handlers are
//! held as subscriptions, so dropping the client unregisters them.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use crate::error::{ChatError, ChatResult};
use crate::protocol::{InboundMessage, MessageContext, OutboundMessage};
use crate::router::Subscription;
use crate::transcript::{ConversationEntry, Transcript};
use crate::transport::{ConnectionState, Transport};

/// Capacity of the session event channel.
const EVENT_BUFFER: usize = 64;

/// State of a chat view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    ConnectedIdle,
    AwaitingReply,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "disconnected",
            Self::ConnectedIdle => "connected-idle",
            Self::AwaitingReply => "awaiting-reply",
        })
    }
}

/// Something a view should render.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    EntryAppended(ConversationEntry),
    StateChanged(SessionState),
}

struct Inner {
    state: SessionState,
    transcript: Transcript,
    /// Correlation id of the send awaiting a reply
    pending: Option<String>,
}

struct Shared {
    inner: Mutex<Inner>,
    events: broadcast::Sender<SessionEvent>,
}

impl Shared {
    fn emit(&self, events: Vec<SessionEvent>) {
        for event in events {
            // No subscribers is fine; the transcript is the source of truth.
            let _ = self.events.send(event);
        }
    }

    fn handle_inbound(&self, message: &InboundMessage) {
        if !message.is_ai_response() {
            trace!("Ignoring {} frame", message.kind);
            return;
        }

        let entry = ConversationEntry::assistant(message.content.clone());
        let mut events = Vec::with_capacity(2);
        {
            let mut inner = self.inner.lock();
            // Only one send is ever outstanding, so any reply answers it.
            let pending = inner.pending.take();
            match (&message.correlation_id, &pending) {
                (Some(got), Some(sent)) if got != sent => {
                    debug!("Reply correlation id {} does not match sent {}", got, sent)
                }
                (Some(got), None) => debug!("Reply {} arrived with no send outstanding", got),
                _ => {}
            }

            inner.transcript.append(entry.clone());
            events.push(SessionEvent::EntryAppended(entry));

            if inner.state == SessionState::AwaitingReply {
                inner.state = SessionState::ConnectedIdle;
                events.push(SessionEvent::StateChanged(SessionState::ConnectedIdle));
            }
        }
        self.emit(events);
    }

    fn handle_connection(&self, state: ConnectionState) {
        let next = {
            let mut inner = self.inner.lock();
            let next = match (state, inner.state) {
                (ConnectionState::Open, SessionState::Disconnected) => SessionState::ConnectedIdle,
                (ConnectionState::Closed, _) => {
                    inner.pending = None;
                    SessionState::Disconnected
                }
                (_, current) => current,
            };
            if next == inner.state {
                return;
            }
            inner.state = next;
            next
        };
        info!("Chat session {}", next);
        self.emit(vec![SessionEvent::StateChanged(next)]);
    }
}

/// Coordinates one chat view's connection and transcript.
pub struct SessionClient<T: Transport> {
    transport: Arc<T>,
    context: MessageContext,
    shared: Arc<Shared>,
    subscriptions: Vec<Subscription>,
}

impl<T: Transport + 'static> SessionClient<T> {
    /// Attach to a transport and seed the transcript.
    ///
    /// If the transport is already open the session starts idle; otherwise
    /// it waits for the transport's open event.
    pub fn new(transport: Arc<T>, context: MessageContext, initial_message: Option<String>) -> Self {
        let mut transcript = Transcript::new();
        if let Some(greeting) = initial_message.filter(|m| !m.trim().is_empty()) {
            transcript.append(ConversationEntry::initial(greeting));
        }

        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                transcript,
                pending: None,
            }),
            events,
        });

        let on_message = {
            let shared = Arc::clone(&shared);
            transport.on_message(move |message| shared.handle_inbound(message))
        };
        let on_state = {
            let shared = Arc::clone(&shared);
            transport.on_state_change(move |state| shared.handle_connection(*state))
        };
        shared.handle_connection(transport.state());

        Self {
            transport,
            context,
            shared,
            subscriptions: vec![on_message, on_state],
        }
    }

    /// Open the transport. Safe to call again after a close.
    pub async fn connect(&self) -> ChatResult<()> {
        self.transport.connect().await
    }

    /// Send a user message.
    ///
    /// Rejected without any I/O when the text is blank or the session is
    /// not idle and connected. On success the user entry is already in the
    /// transcript and the session awaits a reply.
    pub fn send(&self, text: &str) -> ChatResult<()> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let message = OutboundMessage::new(text, self.context.clone());
        let entry = ConversationEntry::user(text);
        {
            let mut inner = self.shared.inner.lock();
            if inner.state != SessionState::ConnectedIdle {
                return Err(ChatError::NotReady { state: inner.state });
            }
            inner.transcript.append(entry.clone());
            inner.pending = message.correlation_id.clone();
            inner.state = SessionState::AwaitingReply;
        }
        self.shared.emit(vec![
            SessionEvent::EntryAppended(entry),
            SessionEvent::StateChanged(SessionState::AwaitingReply),
        ]);

        if !self.transport.send(&message) {
            debug!("Outbound message was not transmitted");
        }
        Ok(())
    }

    /// Whether `text` would currently be accepted by [`send`](Self::send).
    pub fn can_send(&self, text: &str) -> bool {
        !text.trim().is_empty() && self.state() == SessionState::ConnectedIdle
    }

    pub fn state(&self) -> SessionState {
        self.shared.inner.lock().state
    }

    /// Whether the "assistant is typing" indicator is shown.
    pub fn is_typing(&self) -> bool {
        self.state() == SessionState::AwaitingReply
    }

    /// Copy of the transcript so far
    pub fn transcript(&self) -> Vec<ConversationEntry> {
        self.shared.inner.lock().transcript.entries().to_vec()
    }

    pub fn context(&self) -> &MessageContext {
        &self.context
    }

    /// Point later messages at a different step of the project.
    pub fn set_step(&mut self, step_id: Option<String>) {
        self.context.step_id = step_id;
    }

    /// Receive transcript and state updates as they happen.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Tear the view down: unregister handlers and close the connection.
    pub async fn close(&mut self) {
        self.subscriptions.clear();
        self.transport.disconnect().await;
        self.shared.handle_connection(ConnectionState::Closed);
    }
}
