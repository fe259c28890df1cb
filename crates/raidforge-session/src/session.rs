//! Session types: the value that identifies a connected user.

use std::time::{Duration, Instant};

use raidforge_protocol::UserId;
use raidforge_transport::ConnectionId;

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of tokens issued by [`MemorySessionStore::issue`].
    ///
    /// Default: one hour.
    ///
    /// [`MemorySessionStore::issue`]: crate::MemorySessionStore::issue
    pub token_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::from_secs(3600),
        }
    }
}

/// The authenticated identity of one connection.
///
/// Created once, after the token is resolved, and passed by reference
/// into every coordinator call. Nothing about the user is stored on the
/// connection object itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub connection_id: ConnectionId,
    pub user_id: UserId,
    pub connected_at: Instant,
}

impl SessionContext {
    pub fn new(connection_id: ConnectionId, user_id: UserId) -> Self {
        Self {
            connection_id,
            user_id,
            connected_at: Instant::now(),
        }
    }
}
