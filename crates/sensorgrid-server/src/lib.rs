pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod handlers;
pub mod identity;
pub mod kv;
pub mod middleware;
pub mod observability;
pub mod server;
pub mod state;
pub mod sweeper;

pub use cache::{CacheStatus, CachedBody, ResponseCache};
pub use config::{AppConfig, CacheConfig, ExportConfig, RedisConfig, ServerConfig};
pub use error::ApiError;
pub use export::{ExportJobRunner, ExportOutcome, JobStatusStore};
pub use kv::KvBackend;
pub use observability::init_tracing;
pub use server::{SensorgridServer, ServerBuilder, build_app};
pub use state::AppState;

/// Create the key-value backend based on configuration.
///
/// ## Modes
///
/// - **Redis disabled**: in-process store (DashMap)
/// - **Redis enabled**: attempts to connect, falls back to in-process on
///   failure
///
/// The fallback lets the server start and serve (uncached where it must)
/// even when Redis is unavailable.
pub async fn create_kv_backend(config: &RedisConfig) -> KvBackend {
    use std::time::Duration;

    if !config.enabled {
        tracing::info!("Redis disabled, using in-process key-value store");
        return KvBackend::new_memory();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    if let Some(ref mut pool_config) = redis_config.pool {
        pool_config.max_size = config.pool_size;
        pool_config.timeouts.wait = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.create = Some(Duration::from_millis(config.timeout_ms));
        pool_config.timeouts.recycle = Some(Duration::from_millis(config.timeout_ms));
    }

    let pool = match redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to in-process store."
            );
            return KvBackend::new_memory();
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");
            KvBackend::new_redis(pool)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to in-process store."
            );
            KvBackend::new_memory()
        }
    }
}
