use std::time::Duration;

/// Errors that can occur while talking to the backing store.
///
/// None of these are retried by SessionForge. They surface to the caller
/// as a fatal error for the operation in flight.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connecting to the store failed, or the connection dropped.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The command did not complete within the configured timeout.
    #[error("store command timed out after {0:?}")]
    Timeout(Duration),

    /// The store answered with an error or an unexpected reply.
    #[error("store protocol error: {0}")]
    Protocol(String),

    /// No pooled connection could be obtained.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// The connection settings are unusable.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::redis::RedisError> for StoreError {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        if e.is_timeout() {
            Self::Timeout(Duration::ZERO)
        } else if e.is_io_error()
            || e.is_connection_refusal()
            || e.is_connection_dropped()
        {
            Self::Connection(e.to_string())
        } else {
            Self::Protocol(e.to_string())
        }
    }
}
