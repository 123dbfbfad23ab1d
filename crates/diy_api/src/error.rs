//! Error types for the request client.

use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur while talking to the backend over HTTP.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The backend answered with a non-2xx status.
    #[error("Failed to {operation}: {status_text}")]
    Status {
        operation: String,
        status: u16,
        status_text: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode response for {operation}: {message}")]
    Decode { operation: String, message: String },

    #[error("Project description is empty")]
    EmptyDescription,

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Project has no steps yet: {0}")]
    NoSteps(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status code, when the failure came from a backend response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the input was rejected before any network call.
    pub fn is_input_rejection(&self) -> bool {
        matches!(self, Self::EmptyDescription)
    }
}
