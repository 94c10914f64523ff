//! Device registry endpoints.
//!
//! Listing is the cached read path; every mutation of an owner's devices
//! invalidates that owner's listing namespace after the record store write
//! succeeds. Responses use the `{"success": ..., ...}` envelope.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use sensorgrid_core::{Device, DeviceStatus};
use sensorgrid_storage::{DeviceFilter, DeviceUpdate};

use crate::cache::{CachedBody, invalidate_namespace, key};
use crate::error::ApiError;
use crate::identity::AuthenticatedUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: Option<String>,
}

/// `POST /devices`
pub async fn register(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Json(body): Json<RegisterDevice>,
) -> Result<Response, ApiError> {
    let name = body.name.trim();
    let kind = body.kind.trim();
    if name.is_empty() {
        return Err(ApiError::input("name must not be empty"));
    }
    if kind.is_empty() {
        return Err(ApiError::input("type must not be empty"));
    }
    let status = body
        .status
        .as_deref()
        .map(str::parse::<DeviceStatus>)
        .transpose()?;

    let device = Device::new(owner, name.to_string(), kind.to_string(), status);
    let created = state.devices.create(&device).await?;
    tracing::info!(owner = %owner, device = %created.id, kind = %created.kind, "device registered");

    invalidate_namespace(&state.kv, &key::device_list_namespace(owner)).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "device": created })),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct ListDevicesParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

/// `GET /devices`
///
/// Input validation happens before the cache lookup, so a bad filter is a
/// 400 and never touches the store.
pub async fn list(
    method: Method,
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Query(params): Query<ListDevicesParams>,
) -> Result<CachedBody, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(str::parse::<DeviceStatus>)
        .transpose()?;
    let filter = DeviceFilter {
        kind: params.kind.clone(),
        status,
    };
    let cache_key = key::device_list_key(owner, params.kind.as_deref(), params.status.as_deref());

    let devices = state.devices.clone();
    state
        .cache
        .read_through(
            &method,
            Some(cache_key),
            state.config.cache.device_list_ttl(),
            move || async move {
                let list = devices.list(owner, &filter).await?;
                Ok(json!({
                    "success": true,
                    "count": list.len(),
                    "devices": list,
                }))
            },
        )
        .await
}

#[derive(Debug, Deserialize)]
pub struct UpdateDevice {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub status: Option<String>,
}

/// `PATCH /devices/{id}`
pub async fn update(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
    Json(body): Json<UpdateDevice>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = body
        .status
        .as_deref()
        .map(str::parse::<DeviceStatus>)
        .transpose()?;
    let update = DeviceUpdate {
        name: body.name,
        kind: body.kind,
        status,
        last_active_at: None,
    };
    if update.is_empty() {
        return Err(ApiError::input("no fields to update"));
    }

    let updated = state
        .devices
        .update(owner, device_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Device"))?;

    invalidate_namespace(&state.kv, &key::device_list_namespace(owner)).await;

    Ok(Json(json!({ "success": true, "device": updated })))
}

/// `DELETE /devices/{id}`
pub async fn remove(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state.devices.delete(owner, device_id).await?;
    if !removed {
        return Err(ApiError::not_found("Device"));
    }
    tracing::info!(owner = %owner, device = %device_id, "device deleted");

    invalidate_namespace(&state.kv, &key::device_list_namespace(owner)).await;
    invalidate_namespace(&state.kv, &key::usage_namespace(owner, device_id)).await;

    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct Heartbeat {
    pub status: Option<String>,
}

/// `POST /devices/{id}/heartbeat`
///
/// Refreshes `last_active_at` and, unless the body says otherwise, flips
/// the device active. The body is optional.
pub async fn heartbeat(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Path(device_id): Path<Uuid>,
    body: Option<Json<Heartbeat>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = body
        .as_ref()
        .and_then(|Json(b)| b.status.as_deref())
        .map(str::parse::<DeviceStatus>)
        .transpose()?
        .unwrap_or(DeviceStatus::Active);

    let update = DeviceUpdate {
        status: Some(status),
        last_active_at: Some(OffsetDateTime::now_utc()),
        ..Default::default()
    };

    let updated = state
        .devices
        .update(owner, device_id, &update)
        .await?
        .ok_or_else(|| ApiError::not_found("Device"))?;

    invalidate_namespace(&state.kv, &key::device_list_namespace(owner)).await;

    Ok(Json(json!({ "success": true, "device": updated })))
}
