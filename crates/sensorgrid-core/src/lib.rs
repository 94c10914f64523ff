//! # sensorgrid-core
//!
//! Core domain types and utilities shared by the SensorGrid crates:
//!
//! - Device and device-log records as they appear on the wire
//! - Export job records and formats
//! - Error types for domain-level failures
//! - UTC date helpers used by the export date-range handling

pub mod error;
pub mod time;
pub mod types;

pub use error::CoreError;
pub use types::{Device, DeviceLog, DeviceStatus, ExportFormat, ExportJob, JobStatus};

/// Convenience result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
