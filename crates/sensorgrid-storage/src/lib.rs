//! # sensorgrid-storage
//!
//! Record-store abstraction layer for the SensorGrid server.
//!
//! This crate defines the traits and types that storage backends implement.
//! It does not contain any implementations - those are provided by separate
//! crates such as `sensorgrid-db-memory`.
//!
//! ## Overview
//!
//! Two traits cover the record store the core consumes:
//! - [`DeviceStore`]: device CRUD with query-by-filter and update-by-filter
//! - [`LogStore`]: append and time-bounded queries over device event logs
//!
//! Listings and queries return newest-first collections. Missing records are
//! `Ok(None)` / `Ok(false)`, never errors; errors are reserved for
//! infrastructure failures.

pub mod error;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use traits::{DeviceStore, LogStore};
pub use types::{DeviceFilter, DeviceUpdate, LogQuery};
