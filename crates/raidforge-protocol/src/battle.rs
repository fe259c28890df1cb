//! Battle snapshot types.
//!
//! A [`BattleState`] is the complete, self-contained record of one raid in
//! progress. It is persisted in the shared store between commands and
//! broadcast to every room member as `changeTurn` after each transition,
//! so it must survive a JSON round-trip unchanged.
//!
//! The boss is an explicit [`ParticipantRole::Boss`] / [`Actor::Boss`]
//! variant rather than a player with a reserved id.

use serde::{Deserialize, Serialize};

use crate::{ConnectionStatus, EventType, PokemonId, RoomId, SkillId, UserId};

/// Who acts (or is targeted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Actor {
    Player(UserId),
    Boss,
}

impl Actor {
    /// Returns `true` for the boss.
    pub fn is_boss(&self) -> bool {
        matches!(self, Self::Boss)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Player(user_id) => write!(f, "{user_id}"),
            Self::Boss => f.write_str("boss"),
        }
    }
}

/// Role-specific identity of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ParticipantRole {
    Player {
        user_id: UserId,
        join_order: u64,
        pokemon_id: PokemonId,
    },
    Boss {
        pokemon_id: PokemonId,
    },
}

/// Remaining uses of one skill for this battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillCharge {
    pub skill_id: SkillId,
    pub remaining_uses: u32,
}

/// A combatant and its battle-local state (independent of the catalog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub role: ParticipantRole,
    pub hp: u32,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
    pub skills: Vec<SkillCharge>,
}

impl Participant {
    /// The actor this participant plays as.
    pub fn actor(&self) -> Actor {
        match self.role {
            ParticipantRole::Player { user_id, .. } => Actor::Player(user_id),
            ParticipantRole::Boss { .. } => Actor::Boss,
        }
    }

    /// The pokemon this participant fights with.
    pub fn pokemon_id(&self) -> PokemonId {
        match self.role {
            ParticipantRole::Player { pokemon_id, .. }
            | ParticipantRole::Boss { pokemon_id } => pokemon_id,
        }
    }

    /// Join order for players; `None` for the boss.
    pub fn join_order(&self) -> Option<u64> {
        match self.role {
            ParticipantRole::Player { join_order, .. } => Some(join_order),
            ParticipantRole::Boss { .. } => None,
        }
    }

    pub fn is_boss(&self) -> bool {
        matches!(self.role, ParticipantRole::Boss { .. })
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn skill(&self, skill_id: SkillId) -> Option<&SkillCharge> {
        self.skills.iter().find(|s| s.skill_id == skill_id)
    }

    pub fn skill_mut(&mut self, skill_id: SkillId) -> Option<&mut SkillCharge> {
        self.skills.iter_mut().find(|s| s.skill_id == skill_id)
    }

    /// Applies `damage`, flooring hp at zero.
    pub fn take_damage(&mut self, damage: u32) {
        self.hp = self.hp.saturating_sub(damage);
    }
}

/// Turn bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    /// Starts at 1, incremented by every applied action.
    pub count: u32,
    /// The only actor allowed to act next.
    pub next: Actor,
}

/// The most recently applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAction {
    pub actor: Actor,
    pub skill_id: SkillId,
    pub targets: Vec<Actor>,
}

/// Outcome of the raid so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Fighting,
    Win,
    Defeat,
}

impl BattleStatus {
    /// `true` once the raid is over. Terminal states are never left.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fighting)
    }
}

impl std::fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fighting => f.write_str("fighting"),
            Self::Win => f.write_str("win"),
            Self::Defeat => f.write_str("defeat"),
        }
    }
}

/// Snapshot of one raid in progress.
///
/// `participants` holds the players in ascending join order followed by
/// exactly one boss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleState {
    pub room_id: RoomId,
    pub participants: Vec<Participant>,
    pub turn: Turn,
    pub last_action: Option<LastAction>,
    pub status: BattleStatus,
    pub event_type: EventType,
}

impl BattleState {
    /// The boss participant, if the snapshot is well formed.
    pub fn boss(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_boss())
    }

    pub fn boss_mut(&mut self) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.is_boss())
    }

    /// Looks up a participant by actor.
    pub fn participant(&self, actor: Actor) -> Option<&Participant> {
        self.participants.iter().find(|p| p.actor() == actor)
    }

    pub fn participant_mut(&mut self, actor: Actor) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.actor() == actor)
    }

    /// Player participants in join order.
    pub fn players(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| !p.is_boss())
    }

    /// Players with hp left, in join order.
    pub fn alive_players(&self) -> Vec<&Participant> {
        let mut alive: Vec<&Participant> =
            self.players().filter(|p| p.is_alive()).collect();
        alive.sort_by_key(|p| p.join_order());
        alive
    }

    /// User ids of every player participant, in join order.
    pub fn player_ids(&self) -> Vec<UserId> {
        self.players()
            .filter_map(|p| match p.actor() {
                Actor::Player(user_id) => Some(user_id),
                Actor::Boss => None,
            })
            .collect()
    }
}
