//! Error types for token codec operations

/// Errors from token issue/verify operations.
///
/// `InvalidSignature` and `Expired` are both terminal for the presented
/// token — there is no partial trust path. `Config` can only occur at
/// profile construction time (startup), never per request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("token configuration error: {0}")]
    Config(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages_are_descriptive() {
        assert_eq!(
            Error::Config("empty secret".into()).to_string(),
            "token configuration error: empty secret"
        );
        assert_eq!(Error::InvalidSignature.to_string(), "invalid token signature");
        assert_eq!(Error::Expired.to_string(), "token expired");
    }
}
