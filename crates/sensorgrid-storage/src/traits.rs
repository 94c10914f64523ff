//! Storage traits for the record-store abstraction layer.
//!
//! Implementations must be thread-safe (`Send + Sync`); every operation is
//! async and may be suspended on I/O without blocking other requests.

use async_trait::async_trait;
use sensorgrid_core::{Device, DeviceLog};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StorageError;
use crate::types::{DeviceFilter, DeviceUpdate, LogQuery};

/// Device records, always scoped to an owner.
///
/// # Example
///
/// ```ignore
/// use sensorgrid_storage::{DeviceStore, StorageError};
///
/// async fn require_device(
///     store: &dyn DeviceStore,
///     owner: uuid::Uuid,
///     id: uuid::Uuid,
/// ) -> Result<sensorgrid_core::Device, StorageError> {
///     store
///         .get(owner, id)
///         .await?
///         .ok_or_else(|| StorageError::not_found("Device", id.to_string()))
/// }
/// ```
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Persists a new device record.
    async fn create(&self, device: &Device) -> Result<Device, StorageError>;

    /// Reads a device by owner and id. `Ok(None)` if absent or owned by
    /// someone else.
    async fn get(&self, owner_id: Uuid, device_id: Uuid) -> Result<Option<Device>, StorageError>;

    /// Query-by-filter over one owner's devices, newest first.
    async fn list(
        &self,
        owner_id: Uuid,
        filter: &DeviceFilter,
    ) -> Result<Vec<Device>, StorageError>;

    /// Update-by-filter with a partial field set. Returns the updated record
    /// or `Ok(None)` if no device matched the owner/id pair.
    async fn update(
        &self,
        owner_id: Uuid,
        device_id: Uuid,
        update: &DeviceUpdate,
    ) -> Result<Option<Device>, StorageError>;

    /// Deletes a device. Returns whether a record was removed.
    async fn delete(&self, owner_id: Uuid, device_id: Uuid) -> Result<bool, StorageError>;

    /// Bulk update-by-filter: flips every active device whose
    /// `last_active_at` is missing or older than `cutoff` to inactive.
    /// Returns the number of devices changed.
    async fn deactivate_idle(&self, cutoff: OffsetDateTime) -> Result<u64, StorageError>;
}

/// Append-only device event logs with time-bounded queries.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Appends a log record.
    async fn append(&self, log: &DeviceLog) -> Result<DeviceLog, StorageError>;

    /// Runs a [`LogQuery`], returning matches newest first.
    async fn query(&self, query: &LogQuery) -> Result<Vec<DeviceLog>, StorageError>;
}
