//! Shared application state handed to every handler.

use std::sync::Arc;

use sensorgrid_storage::{DeviceStore, LogStore};

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::export::{ExportJobRunner, JobStatusStore};
use crate::identity::IdentityResolver;
use crate::kv::KvBackend;

/// Everything a request handler can reach. Cloned per request; every field
/// is cheap to clone (Arc or pooled handle).
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<dyn DeviceStore>,
    pub logs: Arc<dyn LogStore>,
    pub kv: KvBackend,
    pub cache: ResponseCache,
    pub exports: ExportJobRunner,
    pub jobs: JobStatusStore,
    pub identity: Arc<dyn IdentityResolver>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        logs: Arc<dyn LogStore>,
        kv: KvBackend,
        identity: Arc<dyn IdentityResolver>,
        config: AppConfig,
    ) -> Self {
        let cache = ResponseCache::new(kv.clone());
        let jobs = JobStatusStore::new(kv.clone());
        let exports = ExportJobRunner::new(
            logs.clone(),
            jobs.clone(),
            config.export.sync_threshold,
            config.export.job_ttl(),
        );
        Self {
            devices,
            logs,
            kv,
            cache,
            exports,
            jobs,
            identity,
            config: Arc::new(config),
        }
    }
}
