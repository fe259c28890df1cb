//! Room-scoped fan-out of server events.
//!
//! Each connection handler owns an unbounded receiver; the broadcaster
//! keeps the matching senders grouped by room. Sends never block, and a
//! sender whose handler has gone away is dropped on the next broadcast.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use raidforge_protocol::{BattleState, RoomId, RoomSnapshot, ServerMessage, UserId};
use raidforge_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for delivering events to one connection.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// A connection's outbound channel, tagged with who it belongs to.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub connection_id: ConnectionId,
    pub sender: OutboundSender,
}

#[derive(Debug)]
struct Subscriber {
    user_id: UserId,
    sender: OutboundSender,
}

type Subscribers = HashMap<ConnectionId, Subscriber>;

/// Room → subscribed connections.
#[derive(Debug, Default)]
pub struct Broadcaster {
    rooms: Mutex<HashMap<RoomId, Subscribers>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    fn rooms(&self) -> MutexGuard<'_, HashMap<RoomId, Subscribers>> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, room_id: &RoomId, user_id: UserId, outbound: Outbound) {
        self.rooms().entry(room_id.clone()).or_default().insert(
            outbound.connection_id,
            Subscriber {
                user_id,
                sender: outbound.sender,
            },
        );
    }

    /// Returns `true` if the connection was subscribed.
    pub fn unsubscribe(&self, room_id: &RoomId, connection_id: ConnectionId) -> bool {
        let mut rooms = self.rooms();
        let Some(subs) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = subs.remove(&connection_id).is_some();
        if subs.is_empty() {
            rooms.remove(room_id);
        }
        removed
    }

    /// Drops every connection `user_id` has in the room.
    pub fn unsubscribe_user(&self, room_id: &RoomId, user_id: UserId) {
        let mut rooms = self.rooms();
        if let Some(subs) = rooms.get_mut(room_id) {
            subs.retain(|_, s| s.user_id != user_id);
            if subs.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Drops the connection from every room. Returns the rooms it was in.
    pub fn unsubscribe_all(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        let mut rooms = self.rooms();
        let mut left = Vec::new();
        rooms.retain(|room_id, subs| {
            if subs.remove(&connection_id).is_some() {
                left.push(room_id.clone());
            }
            !subs.is_empty()
        });
        left
    }

    pub fn room_update(&self, snapshot: &RoomSnapshot) {
        self.send(
            &snapshot.room_id,
            ServerMessage::RoomUpdate(snapshot.clone()),
        );
    }

    pub fn change_turn(&self, state: &BattleState) {
        self.send(&state.room_id, ServerMessage::ChangeTurn(state.clone()));
    }

    /// Forgets the room entirely; its subscribers receive nothing more.
    pub fn close_room(&self, room_id: &RoomId) {
        if let Some(subs) = self.rooms().remove(room_id) {
            tracing::debug!(%room_id, subscribers = subs.len(), "room channel closed");
        }
    }

    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms().get(room_id).map_or(0, HashMap::len)
    }

    fn send(&self, room_id: &RoomId, msg: ServerMessage) {
        let mut rooms = self.rooms();
        let Some(subs) = rooms.get_mut(room_id) else {
            return;
        };
        subs.retain(|_, s| s.sender.send(msg.clone()).is_ok());
        if subs.is_empty() {
            rooms.remove(room_id);
        }
    }
}
