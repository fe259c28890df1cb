//! Identity, catalog, and room types shared by every layer.
//!
//! Field names are camelCase on the wire; the web client consumes these
//! payloads directly.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A registered user, as resolved from a session token.
///
/// Serialized as the bare number (`#[serde(transparent)]`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// A pokemon template in the catalog (both player pokemon and bosses).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PokemonId(pub u64);

impl fmt::Display for PokemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PK-{}", self.0)
    }
}

/// A skill template in the catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SkillId(pub u64);

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SK-{}", self.0)
    }
}

/// An opaque room identifier.
///
/// Rooms created by the server get a random UUID, but any string is
/// accepted from clients and looked up verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random (UUID v4) identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Catalog (read-only reference data)
// ---------------------------------------------------------------------------

/// How a skill chooses its targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetMode {
    /// One target. For the boss: a uniformly random living player.
    Single,
    /// Every living opponent.
    All,
}

/// A skill as defined in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTemplate {
    pub id: SkillId,
    pub name: String,
    pub damage: u32,
    pub target_mode: TargetMode,
    /// Uses per battle ("pp").
    pub max_uses: u32,
}

/// A pokemon with its full skill definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PokemonTemplate {
    pub id: PokemonId,
    pub name: String,
    pub hp: u32,
    pub skills: Vec<SkillTemplate>,
}

impl PokemonTemplate {
    /// Looks up one of this pokemon's skills.
    pub fn skill(&self, skill_id: SkillId) -> Option<&SkillTemplate> {
        self.skills.iter().find(|s| s.id == skill_id)
    }
}

/// A skill slot on an owned pokemon: which skill and how many uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillLoadout {
    pub skill_id: SkillId,
    pub pp: u32,
}

/// A pokemon owned by a user, as reported by the user catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedPokemon {
    pub pokemon_id: PokemonId,
    pub hp: u32,
    pub skills: Vec<SkillLoadout>,
}

impl From<&PokemonTemplate> for OwnedPokemon {
    fn from(template: &PokemonTemplate) -> Self {
        Self {
            pokemon_id: template.id,
            hp: template.hp,
            skills: template
                .skills
                .iter()
                .map(|s| SkillLoadout {
                    skill_id: s.id,
                    pp: s.max_uses,
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Whether a participant's connection is live.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    On,
    Off,
}

/// One user seated in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: UserId,
    pub pokemon_id: PokemonId,
    /// Join sequence number, unique and strictly increasing per room.
    pub order: u64,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
}

/// Which command (or query) produced a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "createRoom")]
    CreateRoom,
    #[serde(rename = "joinRoom")]
    JoinRoom,
    #[serde(rename = "leaveRoom")]
    LeaveRoom,
    #[serde(rename = "startRaid")]
    StartRaid,
    #[serde(rename = "action")]
    Action,
    #[serde(rename = "boss_action")]
    BossAction,
    #[serde(rename = "http")]
    Http,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateRoom => "createRoom",
            Self::JoinRoom => "joinRoom",
            Self::LeaveRoom => "leaveRoom",
            Self::StartRaid => "startRaid",
            Self::Action => "action",
            Self::BossAction => "boss_action",
            Self::Http => "http",
        };
        f.write_str(name)
    }
}

/// Room metadata broadcast as `roomUpdate` and returned by `GET /rooms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub leader_id: UserId,
    pub boss_pokemon_id: PokemonId,
    pub members: Vec<Member>,
    pub event_type: EventType,
}
