use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use sensorgrid_db_memory::InMemoryStorage;

use crate::identity::StaticTokenResolver;
use crate::{config::AppConfig, handlers, middleware as app_middleware, state::AppState, sweeper};

pub struct SensorgridServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::health::root))
        .route("/healthz", get(handlers::health::healthz))
        .route("/readyz", get(handlers::health::readyz))
        // Device registry
        .route(
            "/devices",
            get(handlers::devices::list).post(handlers::devices::register),
        )
        .route(
            "/devices/{id}",
            axum::routing::patch(handlers::devices::update).delete(handlers::devices::remove),
        )
        .route("/devices/{id}/heartbeat", post(handlers::devices::heartbeat))
        // Telemetry logs
        .route(
            "/devices/{id}/logs",
            get(handlers::logs::recent).post(handlers::logs::append),
        )
        .route("/devices/{id}/usage", get(handlers::logs::usage))
        // Exports
        .route("/export/devices", get(handlers::export::run))
        .route("/export/devicelogs", post(handlers::export::run_from_body))
        .route("/export/status/{job_id}", get(handlers::export::status))
        // Middleware stack (order: request id -> compression/cors/trace -> body limit)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let req_id = req
                        .extensions()
                        .get::<axum::http::HeaderValue>()
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.target = %uri,
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    /// Assemble state and the router. Async because the key-value backend
    /// probes its connection during creation.
    pub async fn build(self) -> SensorgridServer {
        let storage = Arc::new(InMemoryStorage::new());
        let kv = crate::create_kv_backend(&self.config.redis).await;
        let identity = Arc::new(StaticTokenResolver::new(self.config.auth.tokens.clone()));

        let state = AppState::new(
            storage.clone(),
            storage,
            kv,
            identity,
            self.config,
        );

        sweeper::spawn(&state);

        SensorgridServer {
            addr: self.addr,
            app: build_app(state),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorgridServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
