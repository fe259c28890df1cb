//! The session manager: tracks which connections are live and whose
//! they are.
//!
//! A user may hold several connections at once (two browser tabs). Room
//! membership belongs to the user, not the connection, so the server
//! only treats a close as "the user left" when the user's last
//! connection goes away. [`SessionManager::unregister`] reports that.
//!
//! # Concurrency note
//!
//! Like the rest of the per-process bookkeeping, this is a plain
//! `HashMap` owned behind a mutex at a higher level.

use std::collections::{BTreeSet, HashMap};

use raidforge_protocol::UserId;
use raidforge_transport::ConnectionId;

use crate::{SessionContext, SessionError};

/// Outcome of removing a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregistered {
    /// The context that was registered for the connection.
    pub context: SessionContext,
    /// `true` if the user has no other live connection.
    pub was_last: bool,
}

/// Registry of live connections and their session contexts.
#[derive(Debug, Default)]
pub struct SessionManager {
    contexts: HashMap<ConnectionId, SessionContext>,
    by_user: HashMap<UserId, BTreeSet<ConnectionId>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly authenticated connection.
    ///
    /// # Errors
    /// [`SessionError::AlreadyRegistered`] if the connection already has
    /// a context.
    pub fn register(
        &mut self,
        context: SessionContext,
    ) -> Result<(), SessionError> {
        let connection_id = context.connection_id;
        if self.contexts.contains_key(&connection_id) {
            return Err(SessionError::AlreadyRegistered(connection_id));
        }
        let user_id = context.user_id;
        self.by_user.entry(user_id).or_default().insert(connection_id);
        self.contexts.insert(connection_id, context);
        tracing::info!(%connection_id, %user_id, "session registered");
        Ok(())
    }

    /// Forgets a connection. Returns `None` if it was never registered
    /// (so repeated calls are harmless).
    pub fn unregister(
        &mut self,
        connection_id: ConnectionId,
    ) -> Option<Unregistered> {
        let context = self.contexts.remove(&connection_id)?;
        let was_last = match self.by_user.get_mut(&context.user_id) {
            Some(conns) => {
                conns.remove(&connection_id);
                if conns.is_empty() {
                    self.by_user.remove(&context.user_id);
                    true
                } else {
                    false
                }
            }
            None => true,
        };
        tracing::info!(
            %connection_id,
            user_id = %context.user_id,
            was_last,
            "session unregistered"
        );
        Some(Unregistered { context, was_last })
    }

    /// Live connections of `user_id`, in id order.
    pub fn connections_of(&self, user_id: UserId) -> Vec<ConnectionId> {
        self.by_user
            .get(&user_id)
            .map(|conns| conns.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of live connections.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(conn: u64, user: u64) -> SessionContext {
        SessionContext::new(ConnectionId::new(conn), UserId(user))
    }

    #[test]
    fn test_register_tracks_connection_and_user() {
        let mut mgr = SessionManager::new();
        mgr.register(ctx(1, 10)).unwrap();

        assert_eq!(mgr.len(), 1);
        assert_eq!(mgr.connections_of(UserId(10)), vec![ConnectionId::new(1)]);
        assert!(mgr.connections_of(UserId(11)).is_empty());
    }

    #[test]
    fn test_register_same_connection_twice_is_rejected() {
        let mut mgr = SessionManager::new();
        mgr.register(ctx(1, 10)).unwrap();

        let result = mgr.register(ctx(1, 11));
        assert!(matches!(
            result,
            Err(SessionError::AlreadyRegistered(c)) if c == ConnectionId::new(1)
        ));
    }

    #[test]
    fn test_unregister_reports_last_connection() {
        let mut mgr = SessionManager::new();
        mgr.register(ctx(1, 10)).unwrap();
        mgr.register(ctx(2, 10)).unwrap();
        assert_eq!(
            mgr.connections_of(UserId(10)),
            vec![ConnectionId::new(1), ConnectionId::new(2)]
        );

        let first = mgr.unregister(ConnectionId::new(1)).unwrap();
        assert!(!first.was_last);
        assert_eq!(mgr.connections_of(UserId(10)), vec![ConnectionId::new(2)]);

        let second = mgr.unregister(ConnectionId::new(2)).unwrap();
        assert!(second.was_last);
        assert_eq!(second.context.user_id, UserId(10));
        assert!(mgr.connections_of(UserId(10)).is_empty());
        assert!(mgr.is_empty());
    }

    #[test]
    fn test_unregister_unknown_connection_is_none() {
        let mut mgr = SessionManager::new();
        assert!(mgr.unregister(ConnectionId::new(99)).is_none());
    }
}
