//! HTTP request handlers, grouped by resource.

pub mod devices;
pub mod export;
pub mod health;
pub mod logs;
