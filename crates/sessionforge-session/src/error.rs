//! Error types for the session layer.

use sessionforge_store::StoreError;

use crate::CodecError;

/// Errors that can occur while resolving or using a session.
///
/// Identity resolution never fails and a half-written record is treated
/// as "no session", so what is left is store trouble, values that don't
/// encode/decode, and legacy operations we refuse to fake.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing store failed. Not retried; the request should fail.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An attribute value could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The operation exists for API parity only and always fails.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_session_error_store_is_transparent() {
        let err = SessionError::from(StoreError::Timeout(Duration::from_millis(2000)));
        assert_eq!(err.to_string(), StoreError::Timeout(Duration::from_millis(2000)).to_string());
    }

    #[test]
    fn test_session_error_unsupported_display() {
        let err = SessionError::Unsupported("session context");
        assert_eq!(err.to_string(), "session context is not supported");
    }
}
