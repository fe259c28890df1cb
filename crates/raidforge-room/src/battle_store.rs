//! Persistence of [`BattleState`] snapshots.

use raidforge_protocol::{BattleState, RoomId};
use raidforge_store::KvStore;

use crate::{RoomError, keys};

/// Reads and writes a room's battle state as JSON.
#[derive(Debug, Clone)]
pub struct BattleStateStore<S> {
    store: S,
}

impl<S: KvStore> BattleStateStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Overwrites the stored state for `state.room_id`.
    pub async fn save(&self, state: &BattleState) -> Result<(), RoomError> {
        let key = keys::battle_state(&state.room_id);
        let encoded = serde_json::to_string(state)
            .map_err(|e| RoomError::corrupt(&key, e))?;
        self.store.set(&key, &encoded).await?;
        Ok(())
    }

    pub async fn load(
        &self,
        room_id: &RoomId,
    ) -> Result<Option<BattleState>, RoomError> {
        let key = keys::battle_state(room_id);
        match self.store.get(&key).await? {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| RoomError::corrupt(&key, e)),
        }
    }

    /// Like [`load`](Self::load) but a missing state is
    /// [`RoomError::NotFound`].
    pub async fn require(
        &self,
        room_id: &RoomId,
    ) -> Result<BattleState, RoomError> {
        self.load(room_id)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))
    }

    /// Returns `true` if a state was stored.
    pub async fn remove(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        Ok(self.store.del(&keys::battle_state(room_id)).await?)
    }
}
