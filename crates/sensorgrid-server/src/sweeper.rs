//! Background sweep flipping idle devices to inactive.
//!
//! Devices whose `last_active_at` is missing or older than the configured
//! cutoff (default 24 h) are marked inactive on a fixed period (default
//! 15 min). The sweep does not touch per-owner cache namespaces: affected
//! listings converge at their TTL, the same consistency bound a failed
//! invalidation has.

use std::time::Duration;

use time::{Duration as TimeDuration, OffsetDateTime};

use crate::state::AppState;

pub fn spawn(state: &AppState) {
    let cfg = &state.config.sweeper;
    if !cfg.enabled {
        tracing::info!("idle-device sweeper disabled");
        return;
    }

    let devices = state.devices.clone();
    let interval = Duration::from_secs(cfg.interval_secs);
    let idle_after = TimeDuration::seconds(cfg.idle_after_secs as i64);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the sweep runs on
        // the period, not at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let cutoff = OffsetDateTime::now_utc() - idle_after;
            match devices.deactivate_idle(cutoff).await {
                Ok(0) => {
                    tracing::debug!("idle sweep: nothing to do");
                }
                Ok(changed) => {
                    tracing::info!(devices = changed, "idle sweep deactivated devices");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "idle sweep failed");
                }
            }
        }
    });

    tracing::info!(
        interval_secs = cfg.interval_secs,
        idle_after_secs = cfg.idle_after_secs,
        "idle-device sweeper started"
    );
}
