//! Shared key-value store for Raidforge.
//!
//! Room and battle state live in an external store so that any server
//! process can read them. This crate defines the small command surface
//! the rest of the workspace needs ([`KvStore`]) and two backends:
//!
//! - [`MemoryStore`] — a process-local map, used in development and tests
//! - `RedisStore` — Redis via a connection manager (feature `redis`)
//!
//! The surface mirrors Redis semantics: string values, lists, atomic
//! counters, and glob key scans.

mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;

use std::future::Future;

/// The commands the coordinator issues against the shared store.
///
/// Every method is a single round-trip. None of them is transactional
/// with respect to another; callers that need multi-key consistency
/// serialize access themselves.
pub trait KvStore: Send + Sync + 'static {
    /// Reads a string value.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Writes a string value, replacing whatever was there.
    fn set(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a key of any type. Returns `true` if it existed.
    fn del(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn exists(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Atomically increments an integer counter (created at 0) and
    /// returns the new value.
    fn incr(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<i64, StoreError>> + Send;

    /// Appends to a list and returns its new length.
    fn rpush(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Returns list elements `start..=stop`. Negative indices count from
    /// the end, so `(0, -1)` is the whole list.
    fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Removes every element equal to `value`. Returns how many went.
    fn lrem(
        &self,
        key: &str,
        value: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    fn llen(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Keys matching a glob pattern (`*` and `?`).
    fn keys(
        &self,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}
