use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use sensorgrid_core::{Device, DeviceLog, DeviceStatus};
use sensorgrid_storage::{DeviceFilter, DeviceStore, DeviceUpdate, LogQuery, LogStore, StorageError};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Device record plus its insertion sequence number. Listings sort on the
/// sequence so "newest first" stays deterministic even when creation
/// timestamps collide.
#[derive(Debug, Clone)]
struct StoredDevice {
    device: Device,
    seq: u64,
}

/// In-memory storage backend.
///
/// This storage implementation provides:
/// - Concurrent device access via `DashMap`
/// - Query-by-filter and update-by-filter semantics matching the traits
/// - Append-only logs behind an async `RwLock`
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    devices: DashMap<Uuid, StoredDevice>,
    logs: Arc<RwLock<Vec<DeviceLog>>>,
    seq_counter: AtomicU64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq_counter.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceStore for InMemoryStorage {
    async fn create(&self, device: &Device) -> Result<Device, StorageError> {
        let stored = StoredDevice {
            device: device.clone(),
            seq: self.next_seq(),
        };
        self.devices.insert(device.id, stored);
        Ok(device.clone())
    }

    async fn get(&self, owner_id: Uuid, device_id: Uuid) -> Result<Option<Device>, StorageError> {
        Ok(self
            .devices
            .get(&device_id)
            .filter(|s| s.device.owner_id == owner_id)
            .map(|s| s.device.clone()))
    }

    async fn list(
        &self,
        owner_id: Uuid,
        filter: &DeviceFilter,
    ) -> Result<Vec<Device>, StorageError> {
        let mut matches: Vec<StoredDevice> = self
            .devices
            .iter()
            .filter(|entry| {
                let d = &entry.device;
                d.owner_id == owner_id && filter.matches(&d.kind, d.status)
            })
            .map(|entry| entry.clone())
            .collect();
        matches.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(matches.into_iter().map(|s| s.device).collect())
    }

    async fn update(
        &self,
        owner_id: Uuid,
        device_id: Uuid,
        update: &DeviceUpdate,
    ) -> Result<Option<Device>, StorageError> {
        match self.devices.get_mut(&device_id) {
            Some(mut entry) if entry.device.owner_id == owner_id => {
                let device = &mut entry.device;
                if let Some(ref name) = update.name {
                    device.name = name.clone();
                }
                if let Some(ref kind) = update.kind {
                    device.kind = kind.clone();
                }
                if let Some(status) = update.status {
                    device.status = status;
                }
                if let Some(ts) = update.last_active_at {
                    device.last_active_at = Some(ts);
                }
                Ok(Some(device.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, owner_id: Uuid, device_id: Uuid) -> Result<bool, StorageError> {
        Ok(self
            .devices
            .remove_if(&device_id, |_, s| s.device.owner_id == owner_id)
            .is_some())
    }

    async fn deactivate_idle(&self, cutoff: OffsetDateTime) -> Result<u64, StorageError> {
        let mut changed = 0u64;
        for mut entry in self.devices.iter_mut() {
            let device = &mut entry.device;
            let idle = match device.last_active_at {
                None => true,
                Some(ts) => ts < cutoff,
            };
            if device.status == DeviceStatus::Active && idle {
                device.status = DeviceStatus::Inactive;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl LogStore for InMemoryStorage {
    async fn append(&self, log: &DeviceLog) -> Result<DeviceLog, StorageError> {
        self.logs.write().await.push(log.clone());
        Ok(log.clone())
    }

    async fn query(&self, query: &LogQuery) -> Result<Vec<DeviceLog>, StorageError> {
        let logs = self.logs.read().await;
        let mut matches: Vec<DeviceLog> = logs
            .iter()
            .filter(|log| {
                log.owner_id == query.owner_id
                    && query.device_id.is_none_or(|d| log.device_id == d)
                    && query.since.is_none_or(|s| log.timestamp >= s)
                    && query.until.is_none_or(|u| log.timestamp <= u)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }
}
