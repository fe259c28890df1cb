//! Error types for the session layer.

use raidforge_transport::ConnectionId;

/// Errors that can occur while resolving or tracking sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was missing, unknown, or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The session backend could not be reached.
    #[error("session store unavailable: {0}")]
    Unavailable(String),

    /// A context is already registered for this connection.
    #[error("connection {0} already has a session")]
    AlreadyRegistered(ConnectionId),
}
