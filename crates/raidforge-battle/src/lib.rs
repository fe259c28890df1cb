//! Raid battle rules for Raidforge.
//!
//! The engine is a set of pure functions over
//! [`BattleState`](raidforge_protocol::BattleState): each takes the
//! current state and returns either a new state or a [`BattleError`].
//! A rejected command never yields a partially updated state.
//!
//! There is no I/O here and no clock. Randomness (the boss's skill and
//! target choice) comes from a caller-supplied [`rand::Rng`], so tests
//! can replay a fight from a fixed seed.
//!
//! # Turn order
//!
//! Living players act in join order, then the boss, then the first
//! living player again. See [`next_actor`].
//!
//! ```text
//! start ──► P1 ──► P2 ──► Boss ──► P1 ──► ...  until win | defeat
//! ```

mod engine;
mod error;
mod turn;

pub use engine::{
    PlayerSeat, apply_boss_action, apply_player_action, forfeit, start,
};
pub use error::BattleError;
pub use turn::{compute_status, next_actor};
