//! Error types for battle transitions.

use raidforge_protocol::{Actor, BattleStatus, SkillId, UserId};

/// Reasons a battle transition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BattleError {
    /// The battle is already over.
    #[error("battle already ended ({0})")]
    Terminal(BattleStatus),

    /// Someone other than the turn owner tried to act.
    #[error("not {actor}'s turn (next is {expected})")]
    Turn { actor: Actor, expected: Actor },

    /// The skill is unknown to the actor's pokemon.
    #[error("{actor} has no skill {skill_id}")]
    SkillNotFound { actor: Actor, skill_id: SkillId },

    /// The user is not a participant of this battle.
    #[error("{0} is not in this battle")]
    NotParticipant(UserId),

    /// The state violates a structural invariant (no boss, no players).
    #[error("malformed battle state: {0}")]
    Malformed(String),
}
