//! Job status persistence over the key-value store.

use std::time::Duration;

use sensorgrid_core::ExportJob;
use uuid::Uuid;

use crate::kv::{KvBackend, KvError};

/// Thin facade over the key-value store, keyed by job id.
///
/// Writes are crate-internal: only the export runner mutates job records.
/// Every other component (the status endpoint in particular) reads.
#[derive(Clone)]
pub struct JobStatusStore {
    kv: KvBackend,
}

impl JobStatusStore {
    pub fn new(kv: KvBackend) -> Self {
        Self { kv }
    }

    #[inline]
    fn job_key(job_id: Uuid) -> String {
        format!("export:{job_id}")
    }

    /// Fetch a job by id. Unknown and expired ids are both `Ok(None)`,
    /// which the status endpoint surfaces as not-found, never as a server
    /// error.
    pub async fn get(&self, job_id: Uuid) -> Result<Option<ExportJob>, KvError> {
        let key = Self::job_key(job_id);
        let Some(bytes) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<ExportJob>(&bytes) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to deserialize job record");
                Ok(None)
            }
        }
    }

    /// Persist a job record with the given TTL. Crate-internal: the runner
    /// owns every write in a job's lifecycle.
    pub(crate) async fn put(
        &self,
        job_id: Uuid,
        job: &ExportJob,
        ttl: Duration,
    ) -> Result<(), KvError> {
        let key = Self::job_key(job_id);
        let bytes = serde_json::to_vec(job)?;
        self.kv.set_ex(&key, bytes, ttl).await
    }
}
