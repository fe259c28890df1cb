//! Unified error type for the raid server.

use raidforge_battle::BattleError;
use raidforge_protocol::{ProtocolError, RoomId, UserId};
use raidforge_room::RoomError;
use raidforge_session::SessionError;
use raidforge_store::StoreError;
use raidforge_transport::TransportError;

use crate::catalog::CatalogError;
use crate::reward::LedgerError;

/// Top-level error that wraps all crate-specific errors plus the
/// coordinator's own rejections.
///
/// Every variant maps to a wire status via [`code`](Self::code); that is
/// the `code` field of the `error` event a client receives.
#[derive(Debug, thiserror::Error)]
pub enum RaidError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Battle(#[from] BattleError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A referenced pokemon, boss, or room does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The room already has the maximum number of members.
    #[error("room {0} is full")]
    Capacity(RoomId),

    /// The user is already seated in a room.
    #[error("{user_id} is already in room {room_id}")]
    MembershipConflict { user_id: UserId, room_id: RoomId },

    #[error("{user_id} is not a member of room {room_id}")]
    NotMember { user_id: UserId, room_id: RoomId },

    /// Only the room leader may do this.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The room is not in a state that allows this command.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// A room actor stopped before answering.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RaidError {
    /// HTTP-style status code sent to clients.
    pub fn code(&self) -> u16 {
        match self {
            Self::Transport(_) => 500,
            Self::Protocol(_) => 400,
            Self::Session(e) => match e {
                SessionError::Unauthorized(_) => 401,
                SessionError::Unavailable(_) => 503,
                SessionError::AlreadyRegistered(_) => 409,
            },
            Self::Store(e) => store_code(e),
            Self::Room(e) => match e {
                RoomError::NotFound(_) => 404,
                RoomError::AlreadyExists(_) => 409,
                RoomError::Corrupt { .. } => 500,
                RoomError::Store(e) => store_code(e),
            },
            Self::Battle(e) => match e {
                BattleError::Terminal(_) => 409,
                BattleError::Turn { .. } => 403,
                BattleError::SkillNotFound { .. } => 404,
                BattleError::NotParticipant(_) => 403,
                BattleError::Malformed(_) => 500,
            },
            Self::Catalog(_) | Self::Ledger(_) => 503,
            Self::NotFound(_) => 404,
            Self::Capacity(_) | Self::MembershipConflict { .. } => 409,
            Self::NotMember { .. } | Self::Permission(_) => 403,
            Self::Precondition(_) => 412,
            Self::Unavailable(_) => 503,
            Self::Config(_) | Self::Io(_) => 500,
        }
    }
}

fn store_code(err: &StoreError) -> u16 {
    if err.is_unavailable() { 503 } else { 500 }
}
