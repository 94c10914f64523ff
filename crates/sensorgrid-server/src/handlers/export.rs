//! Log export endpoints.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use time::Date;
use uuid::Uuid;

use sensorgrid_core::{CoreError, ExportFormat, ExportJob, time as core_time};

use crate::error::ApiError;
use crate::export::ExportOutcome;
use crate::identity::AuthenticatedUser;
use crate::state::AppState;

const CSV_ATTACHMENT: &str = "attachment; filename=\"device-logs.csv\"";

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    pub format: Option<String>,
}

/// `GET /export/devices`
///
/// Small exports come back inline in the requested format; large ones
/// return 202 with a job id to poll on the status endpoint.
pub async fn run(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    execute(&state, owner, params).await
}

/// `POST /export/devicelogs`
///
/// Body-parameter twin of `GET /export/devices` for clients that submit
/// the range as JSON. Same sync/async decision and response shapes.
pub async fn run_from_body(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Json(params): Json<ExportParams>,
) -> Result<Response, ApiError> {
    execute(&state, owner, params).await
}

async fn execute(
    state: &AppState,
    owner: Uuid,
    params: ExportParams,
) -> Result<Response, ApiError> {
    let start = parse_optional_date(params.start_date.as_deref())?;
    let end = parse_optional_date(params.end_date.as_deref())?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(CoreError::invalid_date_range(start.to_string(), end.to_string()).into());
        }
    }
    let format = params
        .format
        .as_deref()
        .map(str::parse::<ExportFormat>)
        .transpose()?
        .unwrap_or_default();

    match state.exports.run(owner, start, end, format).await? {
        ExportOutcome::Sync { payload, format } => Ok(sync_response(payload, format)),
        ExportOutcome::Async { job_id } => Ok((
            StatusCode::ACCEPTED,
            Json(json!({
                "success": true,
                "jobId": job_id,
                "status": "pending",
            })),
        )
            .into_response()),
    }
}

/// `GET /export/status/{job_id}`
///
/// Unknown, expired and malformed job ids all read as 404; the record is
/// the only evidence a job ever existed.
pub async fn status(
    State(state): State<AppState>,
    AuthenticatedUser(_owner): AuthenticatedUser,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ExportJob>, ApiError> {
    let job = state
        .jobs
        .get(job_id)
        .await
        .map_err(|e| ApiError::internal(format!("job store unavailable: {e}")))?
        .ok_or_else(|| ApiError::not_found("Export job"))?;
    Ok(Json(job))
}

fn parse_optional_date(raw: Option<&str>) -> Result<Option<Date>, ApiError> {
    raw.map(core_time::parse_date).transpose().map_err(Into::into)
}

fn sync_response(payload: String, format: ExportFormat) -> Response {
    match format {
        ExportFormat::Json => {
            let mut res = Response::new(Body::from(payload));
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
            res
        }
        ExportFormat::Csv => {
            let mut res = Response::new(Body::from(payload));
            res.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            );
            res.headers_mut().insert(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static(CSV_ATTACHMENT),
            );
            res
        }
    }
}
