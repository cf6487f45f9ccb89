//! Error types for the service API client

use thiserror::Error;

/// The error type emitted by the service API client
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response not received
    ///
    /// Transient by nature; callers retry these with backoff
    #[error("transport error: {0}")]
    Transport(String),
    /// The service rejected the request
    #[error("service error ({status}): {message}")]
    Api {
        /// The HTTP status code returned
        status: u16,
        /// The service's error message
        message: String,
    },
    /// The relayer failed to submit a withdrawal
    ///
    /// Distinct from other failures: it implies funds were *not* moved
    #[error("relayer error: {0}")]
    Relayer(String),
    /// A response body could not be parsed
    #[error("malformed response: {0}")]
    Parsing(String),
}

impl ApiError {
    /// Whether the error is transient and worth retrying
    pub fn retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Api { status, .. } => *status >= 500,
            ApiError::Relayer(_) | ApiError::Parsing(_) => false,
        }
    }
}
