//! # diy_chat - Realtime chat for DIY Bot
//!
//! Chat views (planning and step execution) talk to the assistant over a
//! single WebSocket. This crate provides:
//!
//! - **Transport**: one duplex connection with an event-driven lifecycle
//! - **Message Router**: ordered fan-out of inbound frames to handlers,
//!   with RAII subscriptions and panic isolation
//! - **Session Client**: the per-view state machine that owns the
//!   transcript and the "assistant is typing" indicator
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  send   ┌─────────────────┐  frames  ┌─────────────┐
//! │  SessionClient  │────────▶│    Transport    │─────────▶│   server    │
//! └────────▲────────┘         └────────┬────────┘◀─────────└─────────────┘
//!          │                           │
//!          │ ai_response / state       ▼
//!          │                  ┌─────────────────┐
//!          └──────────────────│  MessageRouter  │
//!                             └─────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use diy_chat::{MessageContext, SessionClient, WebSocketTransport};
//!
//! # async fn run() -> diy_chat::ChatResult<()> {
//! let transport = Arc::new(WebSocketTransport::new("ws://localhost:8000/ws"));
//! let session = SessionClient::new(transport, MessageContext::project("p1"), None);
//! session.connect().await?;
//! session.send("Which drill bit for tiles?")?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mock;
pub mod protocol;
pub mod router;
pub mod session;
pub mod transcript;
pub mod transport;

pub use error::*;
pub use mock::*;
pub use protocol::*;
pub use router::*;
pub use session::*;
pub use transcript::*;
pub use transport::*;
