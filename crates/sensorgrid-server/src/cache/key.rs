//! Deterministic cache key construction.
//!
//! ## Key format
//!
//! `devices:user:{owner}:list:{filter=value}...` — the namespace part
//! (`devices:user:{owner}:list`) is fixed per resource/owner and every key
//! in the family carries it, so invalidation-by-prefix is complete. Each
//! namespace ends in a fixed segment after the owner id, so one owner's
//! namespace can never be a prefix of another's (`...user:1:list` vs
//! `...user:10:list`).
//!
//! Filter parameters are sorted by name before joining, so logically
//! equivalent requests build the same key no matter the parameter order.
//! Absent filters normalize to `all`.

use uuid::Uuid;

/// Namespace for one owner's device listings.
pub fn device_list_namespace(owner_id: Uuid) -> String {
    format!("devices:user:{owner_id}:list")
}

/// Namespace for one device's usage aggregates.
pub fn usage_namespace(owner_id: Uuid, device_id: Uuid) -> String {
    format!("usage:user:{owner_id}:device:{device_id}")
}

/// Build a key under `namespace` from named filter values. `None` values
/// normalize to `"all"`; pairs are sorted by name.
pub fn filtered_key(namespace: &str, filters: &[(&str, Option<&str>)]) -> String {
    let mut normalized: Vec<(&str, &str)> = filters
        .iter()
        .map(|(name, value)| (*name, value.unwrap_or("all")))
        .collect();
    normalized.sort_by_key(|(name, _)| *name);

    let mut key = String::from(namespace);
    for (name, value) in normalized {
        key.push(':');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// Key for a device listing filtered by kind/status.
pub fn device_list_key(owner_id: Uuid, kind: Option<&str>, status: Option<&str>) -> String {
    filtered_key(
        &device_list_namespace(owner_id),
        &[("status", status), ("type", kind)],
    )
}

/// Key for a usage aggregate over a trailing window of `hours`.
pub fn usage_key(owner_id: Uuid, device_id: Uuid, hours: i64) -> String {
    format!("{}:range={hours}h", usage_namespace(owner_id, device_id))
}
