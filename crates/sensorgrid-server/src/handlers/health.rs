use axum::Json;
use serde_json::{Value, json};

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "sensorgrid",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz() -> Json<Value> {
    // The record store is in-process and the key-value store degrades
    // gracefully, so readiness follows liveness.
    Json(json!({ "status": "ready" }))
}
