//! The closed set of events exchanged over the realtime channel.
//!
//! Both directions use adjacently tagged JSON:
//!
//! ```json
//! { "event": "joinRoom", "data": { "roomId": "…", "myPokemonId": 25 } }
//! ```
//!
//! Payloads that don't match one of these variants fail to decode at the
//! boundary and never reach the coordinator.

use serde::{Deserialize, Serialize};

use crate::{BattleState, PokemonId, RoomId, RoomSnapshot, SkillId, UserId};

/// Protocol version clients must send in [`ClientMessage::Handshake`].
pub const PROTOCOL_VERSION: u32 = 1;

/// Client → server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Authenticates a connection that didn't present a `sessionid`
    /// header during the upgrade.
    Handshake { version: u32, session_id: String },

    /// Keep-alive; answered with [`ServerMessage::HeartbeatAck`].
    Heartbeat { client_time: u64 },

    CreateRoom {
        boss_id: PokemonId,
        my_pokemon_id: PokemonId,
    },

    JoinRoom {
        room_id: RoomId,
        my_pokemon_id: PokemonId,
    },

    LeaveRoom { room_id: RoomId },

    StartRaid { room_id: RoomId },

    Action { room_id: RoomId, skill_id: SkillId },

    /// Graceful goodbye; the server closes the connection.
    Disconnect { reason: String },
}

impl ClientMessage {
    /// The wire name of this event, used in logs and error replies.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Heartbeat { .. } => "heartbeat",
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::LeaveRoom { .. } => "leaveRoom",
            Self::StartRaid { .. } => "startRaid",
            Self::Action { .. } => "action",
            Self::Disconnect { .. } => "disconnect",
        }
    }
}

/// Server → client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    HandshakeAck { user_id: UserId, server_time: u64 },

    HeartbeatAck { client_time: u64, server_time: u64 },

    /// Room membership changed (or the room was destroyed, in which case
    /// `members` is empty).
    RoomUpdate(RoomSnapshot),

    /// The battle advanced, including boss turns.
    ChangeTurn(BattleState),

    /// A command was rejected. Sent only to the originating connection.
    Error {
        code: u16,
        message: String,
        /// Name of the rejected event, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event: Option<String>,
    },
}
