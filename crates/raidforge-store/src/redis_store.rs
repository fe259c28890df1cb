//! Redis-backed [`KvStore`].

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::{KvStore, StoreError};

/// A [`KvStore`] talking to Redis through a reconnecting
/// [`ConnectionManager`].
///
/// The manager is cheap to clone; each command runs on its own clone so
/// no lock is held across a round-trip.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Opens a client for `redis_url` and establishes the managed
    /// connection.
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url)
            .map_err(|err| StoreError::Backend(format!("invalid redis url: {err}")))?;
        let manager = ConnectionManager::new(client).await?;
        tracing::info!("connected to redis");
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl KvStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.conn().get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let () = self.conn().set(key, value).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        let removed: usize = self.conn().del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.conn().exists(key).await?)
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.conn().incr(key, 1_i64).await?)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        Ok(self.conn().rpush(key, value).await?)
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self.conn().lrange(key, start, stop).await?)
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        Ok(self.conn().lrem(key, 0, value).await?)
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.conn().llen(key).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.conn().keys(pattern).await?;
        keys.sort();
        Ok(keys)
    }
}
