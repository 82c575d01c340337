//! Errors raised while talking to the question-answering backend.

use thiserror::Error;

/// A backend response body that could not be turned into a typed value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The body is not JSON, or a field has the wrong type
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    /// A required field is missing or null
    #[error("missing field `{0}`")]
    MissingField(&'static str),
}

/// Failure of a single backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The request never produced an HTTP response
    #[error("transport error: {message}")]
    Transport { message: String, is_retryable: bool },

    /// The backend answered with a non-success status
    #[error("backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    /// The response body did not have the expected shape
    #[error("undecodable response: {0}")]
    Decode(#[from] DecodeError),

    /// The request was refused before being sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// Creates a Transport error
    pub fn transport(message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Transport {
            message: message.into(),
            is_retryable,
        }
    }

    /// The `detail` the backend attached to a rejection, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Check if the backend itself rejected the request
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}
