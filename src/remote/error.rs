use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Errors returned by remote source operations.
pub enum RemoteError {
    /// The store (or key within it) is unknown to the remote.
    #[error("not found on remote: store={store}, key={}", .key.as_deref().unwrap_or("<listing>"))]
    NotFound {
        /// Store id.
        store: String,
        /// Entry key, `None` for listing requests.
        key: Option<String>,
    },

    /// The request did not complete within the configured timeout.
    #[error("request to '{url}' timed out")]
    Timeout {
        /// Request URL.
        url: String,
    },

    /// Connection or protocol failure.
    #[error("request to '{url}' failed: {message}")]
    Transport {
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The remote answered but reported a failure.
    #[error("remote rejected request to '{url}': {message}")]
    Rejected {
        /// Request URL.
        url: String,
        /// Error message (HTTP status or RPC error).
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("invalid response from '{url}': {message}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    ClientBuild {
        /// Error message.
        message: String,
    },
}

impl RemoteError {
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

/// Convenience result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
