//! Error types for principal storage operations

/// Errors from principal storage and password hashing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_detail() {
        assert_eq!(
            Error::NotFound("principal user-1".into()).to_string(),
            "not found: principal user-1"
        );
        assert_eq!(
            Error::Conflict("email a@x.com already registered".into()).to_string(),
            "conflict: email a@x.com already registered"
        );
    }
}
