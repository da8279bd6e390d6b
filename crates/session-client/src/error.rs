//! Error types for client-side session operations

/// Errors from client session operations.
///
/// Clone is required because a single renewal outcome fans out to every
/// waiter queued on the coordinator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid response from token service: {0}")]
    InvalidResponse(String),

    /// The server rejected the request's credential, and the bounded
    /// retry (one replay after renewal) is exhausted.
    #[error("unauthorized")]
    Unauthorized,

    /// Renewal failed; local credentials have been cleared and a fresh
    /// login is required.
    #[error("renewal failed: {0}")]
    RenewalFailed(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
