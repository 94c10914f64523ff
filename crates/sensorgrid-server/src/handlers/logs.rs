//! Telemetry log endpoints: append, recent page, usage aggregate.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use sensorgrid_core::DeviceLog;
use sensorgrid_storage::LogQuery;

use crate::cache::{CachedBody, invalidate_namespace, key};
use crate::error::ApiError;
use crate::identity::AuthenticatedUser;
use crate::state::AppState;

const DEFAULT_LOG_PAGE: usize = 10;
const DEFAULT_USAGE_HOURS: i64 = 24;

#[derive(Debug, Deserialize)]
pub struct AppendLog {
    pub event: String,
    pub value: f64,
}

/// `POST /devices/{id}/logs`
///
/// The usage aggregate for this device changes with every append, so its
/// cache namespace is invalidated; device listings are untouched.
pub async fn append(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
    Json(body): Json<AppendLog>,
) -> Result<Response, ApiError> {
    let event = body.event.trim();
    if event.is_empty() {
        return Err(ApiError::input("event must not be empty"));
    }
    if !body.value.is_finite() {
        return Err(ApiError::input("value must be a finite number"));
    }

    state
        .devices
        .get(owner, device_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Device"))?;

    let log = DeviceLog::new(device_id, owner, event.to_string(), body.value);
    let stored = state.logs.append(&log).await?;

    invalidate_namespace(&state.kv, &key::usage_namespace(owner, device_id)).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "log": stored })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RecentLogsParams {
    pub limit: Option<usize>,
}

/// `GET /devices/{id}/logs`
///
/// Most recent events first, capped by `limit` (default 10). Served
/// uncached: the page is small and changes with every append.
pub async fn recent(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
    Query(params): Query<RecentLogsParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = params.limit.unwrap_or(DEFAULT_LOG_PAGE);
    if limit == 0 {
        return Err(ApiError::input("limit must be > 0"));
    }

    state
        .devices
        .get(owner, device_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Device"))?;

    let logs = state
        .logs
        .query(&LogQuery::for_device(owner, device_id).limit(limit))
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": logs.len(),
        "logs": logs,
    })))
}

#[derive(Debug, Deserialize)]
pub struct UsageParams {
    pub range: Option<String>,
}

/// `GET /devices/{id}/usage`
///
/// Sums log values over a trailing window (default `24h`). Cached with a
/// short TTL; the key carries owner, device and window so a hit can never
/// serve another owner's aggregate.
pub async fn usage(
    method: Method,
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
    Query(params): Query<UsageParams>,
) -> Result<CachedBody, ApiError> {
    let hours = parse_range_hours(params.range.as_deref())?;
    let cache_key = key::usage_key(owner, device_id, hours);

    let devices = state.devices.clone();
    let logs = state.logs.clone();
    state
        .cache
        .read_through(
            &method,
            Some(cache_key),
            state.config.cache.usage_ttl(),
            move || async move {
                devices
                    .get(owner, device_id)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Device"))?;

                let since = OffsetDateTime::now_utc() - TimeDuration::hours(hours);
                let entries = logs
                    .query(&LogQuery::for_device(owner, device_id).since(since))
                    .await?;
                let total: f64 = entries.iter().map(|l| l.value).sum();

                Ok(json!({
                    "success": true,
                    "device_id": device_id,
                    "range": format!("{hours}h"),
                    "count": entries.len(),
                    "total_value": total,
                }))
            },
        )
        .await
}

/// Parse a trailing-window spec like `24h`. Only whole positive hours are
/// accepted.
fn parse_range_hours(range: Option<&str>) -> Result<i64, ApiError> {
    let Some(raw) = range else {
        return Ok(DEFAULT_USAGE_HOURS);
    };
    let hours = raw
        .strip_suffix('h')
        .and_then(|n| n.parse::<i64>().ok())
        .filter(|h| *h > 0)
        .ok_or_else(|| ApiError::input(format!("invalid range: {raw} (expected e.g. 24h)")))?;
    Ok(hours)
}
