//! Read-through cache around response-producing handlers.

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ApiError;
use crate::kv::KvBackend;

static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Outcome of the cache decision, surfaced as the `X-Cache` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served verbatim from the store.
    Hit,
    /// Computed and stored.
    Miss,
    /// Computed; not stored (non-cacheable request or store unavailable).
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// A JSON response body plus the cache decision that produced it.
#[derive(Debug, Clone)]
pub struct CachedBody {
    pub bytes: Vec<u8>,
    pub status: CacheStatus,
}

impl IntoResponse for CachedBody {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::from(self.bytes));
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        res.headers_mut()
            .insert(X_CACHE.clone(), HeaderValue::from_static(self.status.as_str()));
        res
    }
}

/// Read-through response cache over the shared key-value store.
///
/// On a hit the stored payload is served verbatim and `compute` is never
/// invoked. On a miss, `compute` runs, its result is serialized, stored
/// with the TTL and returned - the caller receives the same payload shape
/// either way. Store failures never fail the request.
///
/// There is no stampede protection: concurrent misses for the same key
/// each invoke `compute` and the last store write wins. Computations are
/// idempotent reads, so this costs duplicated work, not correctness.
#[derive(Clone)]
pub struct ResponseCache {
    kv: KvBackend,
}

impl ResponseCache {
    pub fn new(kv: KvBackend) -> Self {
        Self { kv }
    }

    /// Serve `key` from cache, or compute-and-store.
    ///
    /// Only safe reads are cacheable; any other method (and a `None` key,
    /// e.g. when the key builder could not scope the request) passes
    /// through to `compute` untouched. Errors from `compute` are the only
    /// errors that propagate.
    pub async fn read_through<T, F, Fut>(
        &self,
        method: &Method,
        key: Option<String>,
        ttl: Duration,
        compute: F,
    ) -> Result<CachedBody, ApiError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let cacheable = matches!(*method, Method::GET | Method::HEAD);
        let key = match (cacheable, key) {
            (true, Some(key)) => key,
            _ => {
                let payload = compute().await?;
                let bytes = serde_json::to_vec(&payload)
                    .map_err(|e| ApiError::internal(format!("response serialization: {e}")))?;
                return Ok(CachedBody {
                    bytes,
                    status: CacheStatus::Bypass,
                });
            }
        };

        // Lookup failure degrades to a miss, never to a request failure.
        match self.kv.get(&key).await {
            Ok(Some(bytes)) => {
                tracing::debug!(key = %key, "cache hit");
                return Ok(CachedBody {
                    bytes,
                    status: CacheStatus::Hit,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache lookup failed, computing");
            }
        }

        let payload = compute().await?;
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| ApiError::internal(format!("response serialization: {e}")))?;

        let status = match self.kv.set_ex(&key, bytes.clone(), ttl).await {
            Ok(()) => {
                tracing::debug!(key = %key, ttl_secs = %ttl.as_secs(), "cache set");
                CacheStatus::Miss
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cache write failed, bypassing");
                CacheStatus::Bypass
            }
        };

        Ok(CachedBody { bytes, status })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_cache() -> ResponseCache {
        ResponseCache::new(KvBackend::new_memory())
    }

    /// A Redis pool pointing at a closed port: every operation fails at
    /// connection time, which is exactly the "store unavailable" case.
    fn unreachable_cache() -> ResponseCache {
        let mut cfg = deadpool_redis::Config::from_url("redis://127.0.0.1:1");
        let pool_cfg = cfg.pool.get_or_insert_with(Default::default);
        pool_cfg.max_size = 1;
        pool_cfg.timeouts.wait = Some(Duration::from_millis(200));
        pool_cfg.timeouts.create = Some(Duration::from_millis(200));
        let pool = cfg
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .expect("pool config");
        ResponseCache::new(KvBackend::new_redis(pool))
    }

    #[tokio::test]
    async fn miss_then_hit_with_identical_payload() {
        let cache = memory_cache();
        let key = Some("devices:user:u1:list:status=all:type=all".to_string());
        let ttl = Duration::from_secs(60);

        let first = cache
            .read_through(&Method::GET, key.clone(), ttl, || async {
                Ok(json!({"success": true, "devices": ["a"]}))
            })
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        // Second call must not invoke compute.
        let second = cache
            .read_through(&Method::GET, key, ttl, || async {
                Err::<serde_json::Value, _>(ApiError::internal("compute must not run"))
            })
            .await
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.bytes, first.bytes);
    }

    #[tokio::test]
    async fn mutating_methods_bypass() {
        let cache = memory_cache();
        let out = cache
            .read_through(
                &Method::POST,
                Some("k".into()),
                Duration::from_secs(60),
                || async { Ok(json!({"ok": true})) },
            )
            .await
            .unwrap();
        assert_eq!(out.status, CacheStatus::Bypass);
        // Nothing was stored.
        assert!(cache.kv.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_bypasses_without_failing() {
        let cache = memory_cache();
        let out = cache
            .read_through::<serde_json::Value, _, _>(
                &Method::GET,
                None,
                Duration::from_secs(60),
                || async { Ok(json!({"ok": true})) },
            )
            .await
            .unwrap();
        assert_eq!(out.status, CacheStatus::Bypass);
    }

    #[tokio::test]
    async fn store_failure_degrades_to_bypass() {
        let cache = unreachable_cache();
        let out = cache
            .read_through(
                &Method::GET,
                Some("k".into()),
                Duration::from_secs(60),
                || async { Ok(json!({"success": true, "devices": []})) },
            )
            .await
            .unwrap();
        assert_eq!(out.status, CacheStatus::Bypass);
        let body: serde_json::Value = serde_json::from_slice(&out.bytes).unwrap();
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn compute_errors_propagate() {
        let cache = memory_cache();
        let result = cache
            .read_through::<serde_json::Value, _, _>(
                &Method::GET,
                Some("k".into()),
                Duration::from_secs(60),
                || async { Err(ApiError::not_found("Device")) },
            )
            .await;
        assert!(result.is_err());
        // A failed compute must not poison the cache.
        assert!(cache.kv.get("k").await.unwrap().is_none());
    }
}
