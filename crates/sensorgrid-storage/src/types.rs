//! Filter and update types for query-by-filter / update-by-filter operations.

use sensorgrid_core::DeviceStatus;
use time::OffsetDateTime;
use uuid::Uuid;

/// Filter applied to a device listing. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct DeviceFilter {
    pub kind: Option<String>,
    pub status: Option<DeviceStatus>,
}

impl DeviceFilter {
    pub fn matches(&self, kind: &str, status: DeviceStatus) -> bool {
        self.kind.as_deref().is_none_or(|k| k == kind)
            && self.status.is_none_or(|s| s == status)
    }
}

/// Partial field set for update-by-filter. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct DeviceUpdate {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub status: Option<DeviceStatus>,
    pub last_active_at: Option<OffsetDateTime>,
}

impl DeviceUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.kind.is_none()
            && self.status.is_none()
            && self.last_active_at.is_none()
    }
}

/// Time-bounded, owner-scoped query over device logs. Results are newest
/// first; `limit` caps the page size.
#[derive(Debug, Clone)]
pub struct LogQuery {
    pub owner_id: Uuid,
    pub device_id: Option<Uuid>,
    /// Inclusive lower bound on the log timestamp.
    pub since: Option<OffsetDateTime>,
    /// Inclusive upper bound on the log timestamp.
    pub until: Option<OffsetDateTime>,
    pub limit: Option<usize>,
}

impl LogQuery {
    /// All logs for one owner, optionally time-bounded.
    pub fn for_owner(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            device_id: None,
            since: None,
            until: None,
            limit: None,
        }
    }

    /// All logs for one device of an owner.
    pub fn for_device(owner_id: Uuid, device_id: Uuid) -> Self {
        Self {
            device_id: Some(device_id),
            ..Self::for_owner(owner_id)
        }
    }

    pub fn since(mut self, ts: OffsetDateTime) -> Self {
        self.since = Some(ts);
        self
    }

    pub fn until(mut self, ts: OffsetDateTime) -> Self {
        self.until = Some(ts);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
