//! Namespace invalidation after mutations.

use crate::kv::KvBackend;

/// Drop every cache entry under `namespace` for the owner that just
/// mutated a resource.
///
/// Runs the scan to completion before deleting anything, so a batch is
/// invalidated wholly or not at all. If the store errors mid-scan the
/// operation aborts and logs; stale entries then age out at their TTL
/// (eventual consistency bounded by the TTL, not immediate consistency).
///
/// Never fails the caller: handlers invoke this after a successful
/// mutation and the mutation's response must succeed regardless.
pub async fn invalidate_namespace(kv: &KvBackend, namespace: &str) {
    let pattern = format!("{namespace}:*");

    let keys = match kv.scan_match(&pattern).await {
        Ok(keys) => keys,
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "cache invalidation scan failed");
            return;
        }
    };

    if keys.is_empty() {
        return;
    }

    match kv.del(&keys).await {
        Ok(()) => {
            tracing::debug!(pattern = %pattern, count = keys.len(), "cache invalidated");
        }
        Err(e) => {
            tracing::warn!(pattern = %pattern, error = %e, "cache invalidation delete failed");
        }
    }
}
