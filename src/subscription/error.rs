use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Errors returned when registering interest in store changes.
pub enum SubscriptionError {
    /// The change source is no longer running.
    #[error("change subscription closed")]
    Closed,

    /// The change source refused the registration.
    #[error("subscription rejected for store {store}: {message}")]
    Rejected {
        /// Store id.
        store: String,
        /// Error message.
        message: String,
    },
}

/// Convenience result type for subscription operations.
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;
