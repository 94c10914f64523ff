//! End-to-end API tests over the in-process router.
//!
//! Exercises the full stack (auth extraction, handlers, cache layer,
//! invalidation, export jobs) against the in-memory record store and the
//! in-process key-value store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use sensorgrid_db_memory::InMemoryStorage;
use sensorgrid_server::identity::StaticTokenResolver;
use sensorgrid_server::{AppConfig, AppState, KvBackend, build_app};

const TOKEN_ALPHA: &str = "token-alpha";
const TOKEN_BETA: &str = "token-beta";

/// Small threshold so the async export path is cheap to trigger.
const TEST_SYNC_THRESHOLD: usize = 5;

fn test_app() -> Router {
    let storage = Arc::new(InMemoryStorage::new());
    let mut config = AppConfig::default();
    config.export.sync_threshold = TEST_SYNC_THRESHOLD;

    let identity = Arc::new(StaticTokenResolver::new(HashMap::from([
        (TOKEN_ALPHA.to_string(), Uuid::new_v4()),
        (TOKEN_BETA.to_string(), Uuid::new_v4()),
    ])));

    let state = AppState::new(
        storage.clone(),
        storage,
        KvBackend::new_memory(),
        identity,
        config,
    );
    build_app(state)
}

fn get(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(res: axum::http::Response<Body>) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn x_cache(res: &axum::http::Response<Body>) -> String {
    res.headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

async fn register_device(app: &Router, token: &str, name: &str, kind: &str) -> Uuid {
    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/devices",
            token,
            json!({ "name": name, "type": kind }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    body["device"]["id"].as_str().unwrap().parse().unwrap()
}

async fn append_log(app: &Router, token: &str, device: Uuid, event: &str, value: f64) {
    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/devices/{device}/logs"),
            token,
            json!({ "event": event, "value": value }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn requests_without_a_valid_token_are_rejected() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/devices").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["success"], false);

    let res = app.clone().oneshot(get("/devices", "wrong")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Health endpoints stay public.
    let res = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn device_listing_caches_and_invalidates() {
    let app = test_app();
    register_device(&app, TOKEN_ALPHA, "lamp", "light").await;

    // First read computes and stores.
    let res = app.clone().oneshot(get("/devices", TOKEN_ALPHA)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(x_cache(&res), "MISS");
    let first = body_json(res).await;
    assert_eq!(first["count"], 1);

    // Second read is a verbatim hit.
    let res = app.clone().oneshot(get("/devices", TOKEN_ALPHA)).await.unwrap();
    assert_eq!(x_cache(&res), "HIT");
    let second = body_json(res).await;
    assert_eq!(second, first);

    // A mutation drops the owner's listing namespace.
    register_device(&app, TOKEN_ALPHA, "meter", "meter").await;
    let res = app.clone().oneshot(get("/devices", TOKEN_ALPHA)).await.unwrap();
    assert_eq!(x_cache(&res), "MISS");
    let body = body_json(res).await;
    assert_eq!(body["count"], 2);
    // Newest first.
    assert_eq!(body["devices"][0]["name"], "meter");
}

#[tokio::test]
async fn filtered_listings_use_distinct_cache_entries() {
    let app = test_app();
    register_device(&app, TOKEN_ALPHA, "lamp", "light").await;
    register_device(&app, TOKEN_ALPHA, "meter", "meter").await;

    let res = app
        .clone()
        .oneshot(get("/devices?type=light", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(x_cache(&res), "MISS");
    assert_eq!(body_json(res).await["count"], 1);

    // The unfiltered listing is a different key, so it is still a miss.
    let res = app.clone().oneshot(get("/devices", TOKEN_ALPHA)).await.unwrap();
    assert_eq!(x_cache(&res), "MISS");
    assert_eq!(body_json(res).await["count"], 2);

    // Bad filter values are rejected before the cache is touched.
    let res = app
        .clone()
        .oneshot(get("/devices?status=sleeping", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tenants_never_see_each_other() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "lamp", "light").await;

    let res = app.clone().oneshot(get("/devices", TOKEN_BETA)).await.unwrap();
    assert_eq!(body_json(res).await["count"], 0);

    // Another tenant's mutations and reads of the device are 404s.
    let res = app
        .clone()
        .oneshot(send_json(
            "PATCH",
            &format!("/devices/{device}"),
            TOKEN_BETA,
            json!({ "name": "mine now" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .clone()
        .oneshot(get(&format!("/devices/{device}/logs"), TOKEN_BETA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_delete_and_heartbeat() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "lamp", "light").await;

    // Empty update is an input error.
    let res = app
        .clone()
        .oneshot(send_json(
            "PATCH",
            &format!("/devices/{device}"),
            TOKEN_ALPHA,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(send_json(
            "PATCH",
            &format!("/devices/{device}"),
            TOKEN_ALPHA,
            json!({ "name": "desk lamp" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["device"]["name"], "desk lamp");

    // Heartbeat flips the device active and stamps last_active_at.
    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/devices/{device}/heartbeat"),
            TOKEN_ALPHA,
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["device"]["status"], "active");
    assert!(body["device"]["last_active_at"].is_string());

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/devices/{device}"))
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN_ALPHA}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.clone().oneshot(get("/devices", TOKEN_ALPHA)).await.unwrap();
    assert_eq!(body_json(res).await["count"], 0);
}

#[tokio::test]
async fn recent_logs_default_to_ten_newest() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "meter", "meter").await;

    for i in 0..12 {
        append_log(&app, TOKEN_ALPHA, device, &format!("tick-{i}"), i as f64).await;
    }

    let res = app
        .clone()
        .oneshot(get(&format!("/devices/{device}/logs"), TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["count"], 10);

    let res = app
        .clone()
        .oneshot(get(&format!("/devices/{device}/logs?limit=3"), TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["count"], 3);

    // Invalid events are rejected before any write.
    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/devices/{device}/logs"),
            TOKEN_ALPHA,
            json!({ "event": "   ", "value": 1.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_aggregate_caches_and_invalidates_on_append() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "meter", "meter").await;
    append_log(&app, TOKEN_ALPHA, device, "reading", 2.5).await;
    append_log(&app, TOKEN_ALPHA, device, "reading", 1.5).await;

    let path = format!("/devices/{device}/usage?range=24h");
    let res = app.clone().oneshot(get(&path, TOKEN_ALPHA)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(x_cache(&res), "MISS");
    let body = body_json(res).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["total_value"], 4.0);

    let res = app.clone().oneshot(get(&path, TOKEN_ALPHA)).await.unwrap();
    assert_eq!(x_cache(&res), "HIT");

    // An append drops the device's usage namespace, so the next read
    // recomputes with the new record.
    append_log(&app, TOKEN_ALPHA, device, "reading", 1.0).await;
    let res = app.clone().oneshot(get(&path, TOKEN_ALPHA)).await.unwrap();
    assert_eq!(x_cache(&res), "MISS");
    let body = body_json(res).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["total_value"], 5.0);

    let res = app
        .clone()
        .oneshot(get(&format!("/devices/{device}/usage?range=never"), TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn small_exports_render_inline() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "meter", "meter").await;
    for i in 0..TEST_SYNC_THRESHOLD {
        append_log(&app, TOKEN_ALPHA, device, &format!("tick-{i}"), i as f64).await;
    }

    let res = app
        .clone()
        .oneshot(get("/export/devices", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let body = body_json(res).await;
    assert_eq!(body.as_array().unwrap().len(), TEST_SYNC_THRESHOLD);

    let res = app
        .clone()
        .oneshot(get("/export/devices?format=csv", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"device-logs.csv\""
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(csv.starts_with("device_id,event,value,timestamp\n"));
    assert_eq!(csv.lines().count(), TEST_SYNC_THRESHOLD + 1);
}

#[tokio::test]
async fn body_parameter_export_matches_query_parameter_export() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "meter", "meter").await;
    for i in 0..3 {
        append_log(&app, TOKEN_ALPHA, device, &format!("tick-{i}"), i as f64).await;
    }

    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/export/devicelogs",
            TOKEN_ALPHA,
            json!({ "format": "csv" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"device-logs.csv\""
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    // Same validation rules as the query-parameter form.
    let res = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/export/devicelogs",
            TOKEN_ALPHA,
            json!({ "startDate": "2025-06-20", "endDate": "2025-06-10" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn large_exports_run_as_jobs() {
    let app = test_app();
    let device = register_device(&app, TOKEN_ALPHA, "meter", "meter").await;
    for i in 0..(TEST_SYNC_THRESHOLD + 1) {
        append_log(&app, TOKEN_ALPHA, device, &format!("tick-{i}"), i as f64).await;
    }

    let res = app
        .clone()
        .oneshot(get("/export/devices?format=csv", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body = body_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "pending");
    let job_id = body["jobId"].as_str().unwrap().to_string();

    // Poll until the background task lands the result.
    let mut job = Value::Null;
    for _ in 0..50 {
        let res = app
            .clone()
            .oneshot(get(&format!("/export/status/{job_id}"), TOKEN_ALPHA))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        job = body_json(res).await;
        if job["status"] != "pending" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(job["status"], "ready");
    let payload = job["payload"].as_str().unwrap();
    assert!(payload.starts_with("device_id,event,value,timestamp\n"));
    assert_eq!(payload.lines().count(), TEST_SYNC_THRESHOLD + 2);
}

#[tokio::test]
async fn export_input_validation_and_unknown_jobs() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(get("/export/devices?startDate=15-06-2025", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(get(
            "/export/devices?startDate=2025-06-20&endDate=2025-06-10",
            TOKEN_ALPHA,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .clone()
        .oneshot(get("/export/devices?format=xml", TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let unknown = Uuid::new_v4();
    let res = app
        .clone()
        .oneshot(get(&format!("/export/status/{unknown}"), TOKEN_ALPHA))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let app = test_app();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .header("x-request-id", "test-trace-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.headers().get("x-request-id").unwrap(), "test-trace-1");

    let res = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(res.headers().contains_key("x-request-id"));
}
