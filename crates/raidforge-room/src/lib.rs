//! Room bookkeeping for Raidforge.
//!
//! Everything here is a thin, typed layer over the shared
//! [`KvStore`](raidforge_store::KvStore):
//!
//! - [`RoomRegistry`] — who is in which room, in what order, led by whom
//! - [`BattleStateStore`] — the persisted [`BattleState`] of a raid
//!
//! Neither type serializes concurrent callers. A room's join/leave and
//! battle commands must be funneled through one task at a time (the
//! coordinator's per-room actor does that).
//!
//! # Key layout
//!
//! ```text
//! room:{id}:leader        user id of the creator
//! room:{id}:boss          boss pokemon id
//! room:{id}:memberOrder   join sequence counter
//! room:{id}:members       list of JSON-encoded members
//! room:{id}:battleState   JSON-encoded battle state
//! user:{uid}:room         reverse mapping: the user's current room
//! ```
//!
//! [`BattleState`]: raidforge_protocol::BattleState

mod battle_store;
mod error;
mod keys;
mod registry;

pub use battle_store::BattleStateStore;
pub use error::RoomError;
pub use registry::RoomRegistry;
