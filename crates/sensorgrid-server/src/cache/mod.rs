//! Read-through response caching over the shared key-value store.
//!
//! ## Data flow
//!
//! ```text
//! GET request → key builder → KV lookup → (hit)  stored payload, X-Cache: HIT
//!                                       → (miss) compute → KV set → X-Cache: MISS
//!                                                        → set fails → X-Cache: BYPASS
//! write request → handler → invalidate_namespace (SCAN + DEL, errors logged)
//! ```
//!
//! ## Graceful degradation
//!
//! The cache never fails a request: lookup errors degrade to a miss,
//! write errors degrade to bypass, and invalidation errors leave stale
//! entries that age out at the TTL.

pub mod invalidate;
pub mod key;
pub mod layer;

pub use invalidate::invalidate_namespace;
pub use layer::{CacheStatus, CachedBody, ResponseCache};
