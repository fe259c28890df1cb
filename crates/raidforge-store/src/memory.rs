//! Process-local [`KvStore`] backend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{KvStore, StoreError};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(Vec<String>),
}

/// An in-memory store with Redis-like semantics.
///
/// Cloning is cheap and every clone sees the same data, which is how two
/// coordinators in one test share "the" store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.data.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.lock().await.is_empty()
    }
}

impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self.data.lock().await.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::List(_)) => Err(StoreError::WrongType(key.to_owned())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.data
            .lock()
            .await
            .insert(key.to_owned(), Value::Str(value.to_owned()));
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data.lock().await.contains_key(key))
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut data = self.data.lock().await;
        let current = match data.get(key) {
            None => 0,
            Some(Value::Str(s)) => s
                .parse::<i64>()
                .map_err(|_| StoreError::WrongType(key.to_owned()))?,
            Some(Value::List(_)) => {
                return Err(StoreError::WrongType(key.to_owned()));
            }
        };
        let next = current + 1;
        data.insert(key.to_owned(), Value::Str(next.to_string()));
        Ok(next)
    }

    async fn rpush(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut data = self.data.lock().await;
        let entry = data
            .entry(key.to_owned())
            .or_insert_with(|| Value::List(Vec::new()));
        match entry {
            Value::List(list) => {
                list.push(value.to_owned());
                Ok(list.len())
            }
            Value::Str(_) => Err(StoreError::WrongType(key.to_owned())),
        }
    }

    async fn lrange(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<String>, StoreError> {
        let data = self.data.lock().await;
        let list = match data.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::List(list)) => list,
            Some(Value::Str(_)) => {
                return Err(StoreError::WrongType(key.to_owned()));
            }
        };
        let len = list.len() as isize;
        let resolve = |i: isize| if i < 0 { len + i } else { i };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    async fn lrem(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut data = self.data.lock().await;
        let removed = match data.get_mut(key) {
            None => return Ok(0),
            Some(Value::List(list)) => {
                let before = list.len();
                list.retain(|v| v != value);
                before - list.len()
            }
            Some(Value::Str(_)) => {
                return Err(StoreError::WrongType(key.to_owned()));
            }
        };
        // Redis drops lists that become empty.
        if matches!(data.get(key), Some(Value::List(l)) if l.is_empty()) {
            data.remove(key);
        }
        Ok(removed)
    }

    async fn llen(&self, key: &str) -> Result<usize, StoreError> {
        match self.data.lock().await.get(key) {
            None => Ok(0),
            Some(Value::List(list)) => Ok(list.len()),
            Some(Value::Str(_)) => Err(StoreError::WrongType(key.to_owned())),
        }
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .data
            .lock()
            .await
            .keys()
            .filter(|k| glob_match(pattern.as_bytes(), k.as_bytes()))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Minimal glob matcher supporting `*` (any run) and `?` (one byte).
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pattern.get(p) {
            Some(b'*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == b'?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((sp, st)) => {
                    p = sp + 1;
                    t = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == b'*')
}
