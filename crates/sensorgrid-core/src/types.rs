//! Wire-level domain records.
//!
//! These are the JSON shapes the API serves and the storage layer persists.
//! The `kind` field of a device serializes as `"type"` to keep the public
//! payloads stable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CoreError;

/// Operational status of a registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Active,
    Inactive,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Active => "active",
            DeviceStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(DeviceStatus::Active),
            "inactive" => Ok(DeviceStatus::Inactive),
            other => Err(CoreError::InvalidDeviceStatus(other.to_string())),
        }
    }
}

/// A registered device owned by a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Device category, e.g. "light", "thermostat", "meter".
    #[serde(rename = "type")]
    pub kind: String,
    pub status: DeviceStatus,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_active_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Device {
    /// Create a fresh device record for an owner. Status defaults to
    /// inactive until the first heartbeat.
    pub fn new(owner_id: Uuid, name: String, kind: String, status: Option<DeviceStatus>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            kind,
            status: status.unwrap_or(DeviceStatus::Inactive),
            last_active_at: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// A single telemetry event emitted by a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceLog {
    pub id: Uuid,
    pub device_id: Uuid,
    pub owner_id: Uuid,
    pub event: String,
    pub value: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl DeviceLog {
    pub fn new(device_id: Uuid, owner_id: Uuid, event: String, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            device_id,
            owner_id,
            event,
            value,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Output format of a log export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl Default for ExportFormat {
    fn default() -> Self {
        ExportFormat::Json
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => f.write_str("json"),
            ExportFormat::Csv => f.write_str("csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(CoreError::InvalidExportFormat(other.to_string())),
        }
    }
}

/// Lifecycle state of an asynchronous export job.
///
/// A job is created `pending` and transitions exactly once to `ready` or
/// `failed`; it is never deleted explicitly, expiry is handled by the store
/// TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Ready,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => f.write_str("pending"),
            JobStatus::Ready => f.write_str("ready"),
            JobStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Persisted record of an asynchronous export job, stored as JSON under the
/// job id with a TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportJob {
    pub status: JobStatus,
    pub format: ExportFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ExportJob {
    /// New job awaiting background rendering.
    pub fn pending(format: ExportFormat) -> Self {
        Self {
            status: JobStatus::Pending,
            format,
            payload: None,
            error: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Terminal success state carrying the rendered payload.
    pub fn ready(self, payload: String) -> Self {
        Self {
            status: JobStatus::Ready,
            payload: Some(payload),
            error: None,
            ..self
        }
    }

    /// Terminal failure state carrying the render error message.
    pub fn failed(self, error: String) -> Self {
        Self {
            status: JobStatus::Failed,
            payload: None,
            error: Some(error),
            ..self
        }
    }
}
