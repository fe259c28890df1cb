//! Wire protocol for Raidforge.
//!
//! This crate defines everything that crosses a process boundary:
//!
//! - **Identity and catalog types** ([`UserId`], [`RoomId`],
//!   [`PokemonTemplate`], ...).
//! - **Room snapshots** ([`RoomSnapshot`], [`Member`]) broadcast on
//!   membership changes.
//! - **Battle snapshots** ([`BattleState`], [`Participant`], [`Actor`])
//!   persisted in the shared store and broadcast on every turn.
//! - **Messages** ([`ClientMessage`], [`ServerMessage`]) — the closed set
//!   of events exchanged over the realtime channel.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those values are
//!   turned into bytes.
//!
//! ```text
//! Transport (frames) → Protocol (messages) → Coordinator (rooms, battles)
//! ```

mod battle;
mod codec;
mod error;
mod message;
mod types;

pub use battle::{
    Actor, BattleState, BattleStatus, LastAction, Participant,
    ParticipantRole, SkillCharge, Turn,
};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use message::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
pub use types::{
    ConnectionStatus, EventType, Member, OwnedPokemon, PokemonId,
    PokemonTemplate, RoomId, RoomSnapshot, SkillId, SkillLoadout,
    SkillTemplate, TargetMode, UserId,
};
