//! Error types for the chat client.

use thiserror::Error;

use crate::session::SessionState;

/// Result type alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors raised by the transport socket and session client.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Outbound text was empty after trimming
    #[error("Message is empty")]
    EmptyMessage,

    /// Sending is only allowed while connected and idle
    #[error("Cannot send while session is {state}")]
    NotReady { state: SessionState },

    #[error("WebSocket connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl ChatError {
    /// Whether the error is a user-input rejection with no network involved.
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::EmptyMessage | Self::NotReady { .. })
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidFrame(err.to_string())
    }
}
