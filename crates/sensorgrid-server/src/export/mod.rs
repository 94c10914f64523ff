//! Log export: synchronous for small record sets, deferred jobs for large
//! ones.
//!
//! The runner decides sync vs. async by record count. Async jobs live in
//! the key-value store under `export:{jobId}` with a TTL anchored at job
//! creation; the HTTP response and the background rendering task are two
//! independent units of work joined only through that record.

pub mod render;
pub mod runner;
pub mod status;

pub use render::ExportRow;
pub use runner::{ExportJobRunner, ExportOutcome};
pub use status::JobStatusStore;
