//! Key-value store backend used by the response cache and the job status
//! store.
//!
//! Two modes, mirroring the deployment options:
//!
//! - **Memory**: single-instance mode backed by a `DashMap` with per-entry
//!   expiry. Used for tests and when Redis is disabled.
//! - **Redis**: shared store via a deadpool connection pool. SCAN follows
//!   the cursor protocol to completion before returning.
//!
//! Every operation returns a `Result`; callers decide how a failure
//! degrades (the response cache treats lookup errors as misses and write
//! errors as bypass, invalidation aborts and logs).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use thiserror::Error;

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("redis command error: {0}")]
    Command(#[from] redis::RedisError),

    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    #[error("value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A stored value with its expiry deadline (memory mode only).
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    data: Vec<u8>,
    expires_at: Instant,
}

impl MemoryEntry {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Key-value store backend: in-process map or shared Redis.
#[derive(Clone)]
pub enum KvBackend {
    /// Single-instance: local DashMap only
    Memory(Arc<DashMap<String, MemoryEntry>>),

    /// Multi-instance: shared Redis pool
    Redis(Pool),
}

impl KvBackend {
    /// Create a new in-process backend.
    pub fn new_memory() -> Self {
        KvBackend::Memory(Arc::new(DashMap::new()))
    }

    /// Create a new Redis-backed store.
    pub fn new_redis(pool: Pool) -> Self {
        KvBackend::Redis(pool)
    }

    /// `GET key` - `Ok(None)` on miss or expiry.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        match self {
            KvBackend::Memory(map) => match map.get(key) {
                Some(entry) if !entry.is_expired() => Ok(Some(entry.data.clone())),
                Some(_) => {
                    map.remove(key);
                    Ok(None)
                }
                None => Ok(None),
            },
            KvBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                Ok(conn.get::<_, Option<Vec<u8>>>(key).await?)
            }
        }
    }

    /// `SET key value EXPIRE ttl`.
    pub async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), KvError> {
        match self {
            KvBackend::Memory(map) => {
                map.insert(
                    key.to_string(),
                    MemoryEntry {
                        data: value,
                        expires_at: Instant::now() + ttl,
                    },
                );
                Ok(())
            }
            KvBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                    .await?;
                Ok(())
            }
        }
    }

    /// `DEL key...` - deleting zero keys is not an error.
    pub async fn del(&self, keys: &[String]) -> Result<(), KvError> {
        if keys.is_empty() {
            return Ok(());
        }
        match self {
            KvBackend::Memory(map) => {
                for key in keys {
                    map.remove(key);
                }
                Ok(())
            }
            KvBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                conn.del::<_, ()>(keys).await?;
                Ok(())
            }
        }
    }

    /// `SCAN cursor MATCH pattern` driven to completion: repeats with the
    /// returned cursor until the store hands back the initial sentinel (0),
    /// accumulating every match. Patterns use redis-style globs; the memory
    /// mode supports the `*` wildcard.
    pub async fn scan_match(&self, pattern: &str) -> Result<Vec<String>, KvError> {
        match self {
            KvBackend::Memory(map) => Ok(map
                .iter()
                .filter(|entry| !entry.value().is_expired() && glob_match(pattern, entry.key()))
                .map(|entry| entry.key().clone())
                .collect()),
            KvBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let mut keys = Vec::new();
                let mut cursor: u64 = 0;
                loop {
                    let (next, page): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn)
                        .await?;
                    keys.extend(page);
                    cursor = next;
                    if cursor == 0 {
                        break;
                    }
                }
                Ok(keys)
            }
        }
    }

    /// Number of live entries (memory mode; Redis reports 0).
    pub fn len(&self) -> usize {
        match self {
            KvBackend::Memory(map) => map.len(),
            KvBackend::Redis(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Minimal glob matcher: handles literal text and the `*` wildcard, which is
/// all the cache key patterns use.
fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    if !key.starts_with(first) {
        return false;
    }
    let mut rest = &key[first.len()..];
    let mut segments: Vec<&str> = parts.collect();
    let trailing_wildcard = pattern.ends_with('*');
    let last = if trailing_wildcard { None } else { segments.pop() };

    for seg in segments {
        if seg.is_empty() {
            continue;
        }
        match rest.find(seg) {
            Some(pos) => rest = &rest[pos + seg.len()..],
            None => return false,
        }
    }
    match last {
        Some(suffix) => rest.ends_with(suffix) && rest.len() >= suffix.len(),
        None => trailing_wildcard || rest.is_empty(),
    }
}
