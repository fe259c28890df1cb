//! Error types for the store layer.

/// Errors returned by a [`KvStore`](crate::KvStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached (connection refused, dropped,
    /// timed out).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A command was issued against a key holding the wrong kind of
    /// value, e.g. `get` on a list.
    #[error("wrong type for key {0}")]
    WrongType(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// `true` if retrying later might succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_timeout()
        {
            Self::Unavailable(err.to_string())
        } else {
            Self::Backend(err.to_string())
        }
    }
}
