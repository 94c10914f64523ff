//! Sync/async export decision and background rendering.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sensorgrid_core::{ExportFormat, ExportJob, time as core_time};
use sensorgrid_storage::{LogQuery, LogStore};
use time::Date;
use uuid::Uuid;

use crate::error::ApiError;
use crate::export::render::{ExportRow, render};
use crate::export::status::JobStatusStore;

/// Result of an export request: an immediate payload, or a job id to poll.
#[derive(Debug)]
pub enum ExportOutcome {
    Sync {
        payload: String,
        format: ExportFormat,
    },
    Async {
        job_id: Uuid,
    },
}

/// Runs exports, deciding sync vs. async by record count.
#[derive(Clone)]
pub struct ExportJobRunner {
    logs: Arc<dyn LogStore>,
    jobs: JobStatusStore,
    sync_threshold: usize,
    job_ttl: Duration,
}

impl ExportJobRunner {
    pub fn new(
        logs: Arc<dyn LogStore>,
        jobs: JobStatusStore,
        sync_threshold: usize,
        job_ttl: Duration,
    ) -> Self {
        Self {
            logs,
            jobs,
            sync_threshold,
            job_ttl,
        }
    }

    /// Export an owner's logs over an inclusive date range.
    ///
    /// At or below the threshold the payload is rendered inline. Above it,
    /// a pending job record is written, the job id is returned immediately
    /// and rendering is spawned onto the runtime; the spawned task is the
    /// only writer of the job record after creation and runs to completion
    /// regardless of what happens to the originating request.
    pub async fn run(
        &self,
        owner_id: Uuid,
        start: Option<Date>,
        end: Option<Date>,
        format: ExportFormat,
    ) -> Result<ExportOutcome, ApiError> {
        let mut query = LogQuery::for_owner(owner_id);
        if let Some(start) = start {
            query = query.since(core_time::start_of_day_utc(start));
        }
        if let Some(end) = end {
            // Inclusive of every record within the end day.
            query = query.until(core_time::end_of_day_utc(end));
        }

        let logs = self.logs.query(&query).await?;
        let rows = logs
            .iter()
            .map(ExportRow::from_log)
            .collect::<Result<Vec<_>, _>>()?;

        if rows.len() <= self.sync_threshold {
            let payload = render(&rows, format)?;
            tracing::debug!(owner = %owner_id, records = rows.len(), "export rendered inline");
            return Ok(ExportOutcome::Sync { payload, format });
        }

        let job_id = Uuid::new_v4();
        let job = ExportJob::pending(format);
        self.jobs
            .put(job_id, &job, self.job_ttl)
            .await
            .map_err(|e| ApiError::internal(format!("job store unavailable: {e}")))?;

        tracing::info!(owner = %owner_id, job_id = %job_id, records = rows.len(), "export scheduled");

        let jobs = self.jobs.clone();
        let job_ttl = self.job_ttl;
        let created = Instant::now();
        tokio::spawn(async move {
            let rendered = render(&rows, format);
            let remaining = job_ttl.saturating_sub(created.elapsed());
            complete(&jobs, job_id, job, rendered, remaining).await;
        });

        Ok(ExportOutcome::Async { job_id })
    }
}

/// Land the terminal job record: `ready` with the payload, or `failed`
/// with the render error.
///
/// The TTL stays anchored at creation: `remaining` is the original TTL
/// minus the time rendering took, so the record always expires at
/// creation + TTL. A job that outlives its TTL skips the write and
/// expires unread.
async fn complete(
    jobs: &JobStatusStore,
    job_id: Uuid,
    job: ExportJob,
    rendered: Result<String, sensorgrid_core::CoreError>,
    remaining: Duration,
) {
    let finished = match rendered {
        Ok(payload) => job.ready(payload),
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "export rendering failed");
            job.failed(e.to_string())
        }
    };

    if remaining.is_zero() {
        tracing::warn!(job_id = %job_id, "job outlived its TTL before completion");
        return;
    }
    if let Err(e) = jobs.put(job_id, &finished, remaining).await {
        tracing::warn!(job_id = %job_id, error = %e, "failed to persist job result");
    }
}
