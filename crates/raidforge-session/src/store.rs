//! Session token resolution.
//!
//! Raidforge doesn't log users in or issue tokens; some other service
//! does that and leaves sessions in a shared store. The server only
//! needs one question answered, so the collaborator is a single-method
//! trait, [`SessionStore`].
//!
//! [`MemorySessionStore`] is the in-process implementation used by the
//! development binary and the tests.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use raidforge_protocol::UserId;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::{SessionConfig, SessionError};

/// Resolves a session token to the user it belongs to.
///
/// # Example
///
/// ```rust
/// use raidforge_protocol::UserId;
/// use raidforge_session::{SessionError, SessionStore};
///
/// /// Treats the token as a numeric user id. Development only.
/// struct NumericSessions;
///
/// impl SessionStore for NumericSessions {
///     async fn resolve_session(
///         &self,
///         token: &str,
///     ) -> Result<UserId, SessionError> {
///         token
///             .parse()
///             .map(UserId)
///             .map_err(|_| SessionError::Unauthorized("bad token".into()))
///     }
/// }
/// ```
pub trait SessionStore: Send + Sync + 'static {
    /// Returns the user behind `token`.
    ///
    /// # Errors
    /// - [`SessionError::Unauthorized`] — unknown or expired token
    /// - [`SessionError::Unavailable`] — the backing store is down
    fn resolve_session(
        &self,
        token: &str,
    ) -> impl std::future::Future<Output = Result<UserId, SessionError>> + Send;
}

#[derive(Debug, Clone)]
struct StoredSession {
    user_id: UserId,
    expires_at: Instant,
}

/// An in-memory [`SessionStore`] with per-token expiry.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    config: SessionConfig,
}

impl MemorySessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Stores `token` for `user_id`, valid for the configured TTL.
    pub async fn insert(&self, token: impl Into<String>, user_id: UserId) {
        self.insert_with_ttl(token, user_id, self.config.token_ttl)
            .await;
    }

    /// Stores `token` for `user_id` with an explicit TTL.
    pub async fn insert_with_ttl(
        &self,
        token: impl Into<String>,
        user_id: UserId,
        ttl: Duration,
    ) {
        let stored = StoredSession {
            user_id,
            expires_at: Instant::now() + ttl,
        };
        self.sessions.write().await.insert(token.into(), stored);
    }

    /// Issues a fresh random token for `user_id` and returns it.
    pub async fn issue(&self, user_id: UserId) -> String {
        let token = generate_token();
        self.insert(token.clone(), user_id).await;
        tracing::debug!(%user_id, "session issued");
        token
    }

    /// Drops a token. Returns `true` if it existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }

    /// Removes every expired token and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at > now);
        before - sessions.len()
    }
}

impl SessionStore for MemorySessionStore {
    async fn resolve_session(
        &self,
        token: &str,
    ) -> Result<UserId, SessionError> {
        if token.is_empty() {
            return Err(SessionError::Unauthorized("missing session id".into()));
        }
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            Some(s) if s.expires_at > Instant::now() => Ok(s.user_id),
            Some(_) => Err(SessionError::Unauthorized("session expired".into())),
            None => Err(SessionError::Unauthorized("invalid session".into())),
        }
    }
}

/// Generates a random 32-character hex token (128 bits of entropy).
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
