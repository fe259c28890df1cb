//! Room membership registry.

use raidforge_protocol::{
    ConnectionStatus, EventType, Member, PokemonId, RoomId, RoomSnapshot,
    UserId,
};
use raidforge_store::KvStore;

use crate::{RoomError, keys};

/// Typed access to room metadata and member lists in the shared store.
///
/// A room exists exactly while its leader key exists. Capacity is not
/// checked here; that is a coordinator rule.
#[derive(Debug, Clone)]
pub struct RoomRegistry<S> {
    store: S,
}

impl<S: KvStore> RoomRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Records a new, memberless room.
    ///
    /// # Errors
    /// [`RoomError::AlreadyExists`] if the id is taken.
    pub async fn create_room(
        &self,
        room_id: &RoomId,
        leader_id: UserId,
        boss_id: PokemonId,
    ) -> Result<(), RoomError> {
        if self.exists(room_id).await? {
            return Err(RoomError::AlreadyExists(room_id.clone()));
        }
        self.store
            .set(&keys::boss(room_id), &boss_id.0.to_string())
            .await?;
        self.store
            .set(&keys::leader(room_id), &leader_id.0.to_string())
            .await?;
        tracing::info!(%room_id, %leader_id, %boss_id, "room created");
        Ok(())
    }

    pub async fn exists(&self, room_id: &RoomId) -> Result<bool, RoomError> {
        Ok(self.store.exists(&keys::leader(room_id)).await?)
    }

    /// Appends a member with the next join order and points the user's
    /// reverse mapping at this room.
    pub async fn join(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        pokemon_id: PokemonId,
    ) -> Result<Member, RoomError> {
        self.ensure_exists(room_id).await?;

        let order = self.store.incr(&keys::member_order(room_id)).await?;
        let member = Member {
            user_id,
            pokemon_id,
            order: u64::try_from(order).map_err(|e| {
                RoomError::corrupt(&keys::member_order(room_id), e)
            })?,
            connection_status: ConnectionStatus::On,
        };
        let encoded = serde_json::to_string(&member)
            .map_err(|e| RoomError::corrupt(&keys::members(room_id), e))?;
        self.store.rpush(&keys::members(room_id), &encoded).await?;
        self.store
            .set(&keys::user_room(user_id), room_id.as_str())
            .await?;

        tracing::info!(%room_id, %user_id, order = member.order, "member joined");
        Ok(member)
    }

    /// Removes `user_id` from the room. Returns `false` if they were not a
    /// member (which is not an error). The reverse mapping is cleared
    /// either way.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<bool, RoomError> {
        let key = keys::members(room_id);
        let raw = self.store.lrange(&key, 0, -1).await?;
        let mut removed = false;
        for entry in raw {
            let member = decode_member(&key, &entry)?;
            if member.user_id == user_id {
                removed |= self.store.lrem(&key, &entry).await? > 0;
            }
        }
        self.clear_user_room(user_id).await?;
        if removed {
            tracing::info!(%room_id, %user_id, "member left");
        }
        Ok(removed)
    }

    pub async fn member_count(
        &self,
        room_id: &RoomId,
    ) -> Result<usize, RoomError> {
        self.ensure_exists(room_id).await?;
        Ok(self.store.llen(&keys::members(room_id)).await?)
    }

    /// Members in join order.
    pub async fn members(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<Member>, RoomError> {
        self.ensure_exists(room_id).await?;
        self.read_members(room_id).await
    }

    pub async fn get_leader(
        &self,
        room_id: &RoomId,
    ) -> Result<UserId, RoomError> {
        let key = keys::leader(room_id);
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        raw.parse()
            .map(UserId)
            .map_err(|e| RoomError::corrupt(&key, e))
    }

    pub async fn get_boss(
        &self,
        room_id: &RoomId,
    ) -> Result<PokemonId, RoomError> {
        self.ensure_exists(room_id).await?;
        let key = keys::boss(room_id);
        let raw = self
            .store
            .get(&key)
            .await?
            .ok_or_else(|| RoomError::corrupt(&key, "missing boss"))?;
        raw.parse()
            .map(PokemonId)
            .map_err(|e| RoomError::corrupt(&key, e))
    }

    pub async fn is_member(
        &self,
        room_id: &RoomId,
        user_id: UserId,
    ) -> Result<bool, RoomError> {
        Ok(self
            .members(room_id)
            .await?
            .iter()
            .any(|m| m.user_id == user_id))
    }

    /// Every existing room id, sorted.
    pub async fn list_room_ids(&self) -> Result<Vec<RoomId>, RoomError> {
        let leader_keys = self.store.keys(keys::LEADER_PATTERN).await?;
        let mut ids: Vec<RoomId> = leader_keys
            .iter()
            .filter_map(|k| keys::room_id_from_leader_key(k))
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// The room the user is currently in, if any.
    pub async fn user_room(
        &self,
        user_id: UserId,
    ) -> Result<Option<RoomId>, RoomError> {
        Ok(self
            .store
            .get(&keys::user_room(user_id))
            .await?
            .map(RoomId::new))
    }

    pub async fn clear_user_room(&self, user_id: UserId) -> Result<(), RoomError> {
        self.store.del(&keys::user_room(user_id)).await?;
        Ok(())
    }

    /// Deletes every key of the room, battle state included. Members'
    /// reverse mappings are left to the caller.
    pub async fn remove_room(&self, room_id: &RoomId) -> Result<(), RoomError> {
        for key in [
            keys::leader(room_id),
            keys::boss(room_id),
            keys::member_order(room_id),
            keys::members(room_id),
            keys::battle_state(room_id),
        ] {
            self.store.del(&key).await?;
        }
        tracing::info!(%room_id, "room removed");
        Ok(())
    }

    /// Assembles the wire snapshot of a room.
    pub async fn snapshot(
        &self,
        room_id: &RoomId,
        event_type: EventType,
    ) -> Result<RoomSnapshot, RoomError> {
        let leader_id = self.get_leader(room_id).await?;
        let boss_pokemon_id = self.get_boss(room_id).await?;
        let members = self.read_members(room_id).await?;
        Ok(RoomSnapshot {
            room_id: room_id.clone(),
            leader_id,
            boss_pokemon_id,
            members,
            event_type,
        })
    }

    async fn ensure_exists(&self, room_id: &RoomId) -> Result<(), RoomError> {
        if self.exists(room_id).await? {
            Ok(())
        } else {
            Err(RoomError::NotFound(room_id.clone()))
        }
    }

    async fn read_members(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<Member>, RoomError> {
        let key = keys::members(room_id);
        let mut members = self
            .store
            .lrange(&key, 0, -1)
            .await?
            .iter()
            .map(|raw| decode_member(&key, raw))
            .collect::<Result<Vec<_>, _>>()?;
        members.sort_by_key(|m| m.order);
        Ok(members)
    }
}

fn decode_member(key: &str, raw: &str) -> Result<Member, RoomError> {
    serde_json::from_str(raw).map_err(|e| RoomError::corrupt(key, e))
}
