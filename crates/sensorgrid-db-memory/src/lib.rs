//! # sensorgrid-db-memory
//!
//! In-memory implementation of the SensorGrid record-store traits, used for
//! tests and single-node deployments. Devices live in a concurrent map; logs
//! are an append-only vector behind an async RwLock.

pub mod storage;

pub use storage::InMemoryStorage;
