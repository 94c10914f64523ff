use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Redis configuration for the shared key-value store
    #[serde(default)]
    pub redis: RedisConfig,
    /// Response cache TTLs
    #[serde(default)]
    pub cache: CacheConfig,
    /// Export job sizing and persistence
    #[serde(default)]
    pub export: ExportConfig,
    /// Inactive-device sweeper
    #[serde(default)]
    pub sweeper: SweeperConfig,
    /// Identity resolution (bearer token -> owner id)
    #[serde(default)]
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Cache validations
        if self.cache.device_list_ttl_secs == 0 {
            return Err("cache.device_list_ttl_secs must be > 0".into());
        }
        if self.cache.usage_ttl_secs == 0 {
            return Err("cache.usage_ttl_secs must be > 0".into());
        }
        // Export validations
        if self.export.sync_threshold == 0 {
            return Err("export.sync_threshold must be > 0".into());
        }
        if self.export.job_ttl_secs == 0 {
            return Err("export.job_ttl_secs must be > 0".into());
        }
        // Sweeper validations
        if self.sweeper.enabled {
            if self.sweeper.interval_secs == 0 {
                return Err("sweeper.interval_secs must be > 0".into());
            }
            if self.sweeper.idle_after_secs == 0 {
                return Err("sweeper.idle_after_secs must be > 0".into());
            }
        }
        // Redis validation
        if self.redis.enabled && self.redis.url.is_empty() {
            return Err("redis.enabled=true requires redis.url".into());
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Enable Redis (gracefully degrades without it)
    /// Default: false (disabled for single-instance deployments)
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}
fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}
fn default_redis_pool_size() -> usize {
    10
}
fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Device listing cache TTL in seconds
    #[serde(default = "default_device_list_ttl_secs")]
    pub device_list_ttl_secs: u64,

    /// Usage aggregate cache TTL in seconds
    #[serde(default = "default_usage_ttl_secs")]
    pub usage_ttl_secs: u64,
}

fn default_device_list_ttl_secs() -> u64 {
    900 // 15 minutes
}
fn default_usage_ttl_secs() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            device_list_ttl_secs: default_device_list_ttl_secs(),
            usage_ttl_secs: default_usage_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn device_list_ttl(&self) -> Duration {
        Duration::from_secs(self.device_list_ttl_secs)
    }

    pub fn usage_ttl(&self) -> Duration {
        Duration::from_secs(self.usage_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Record count at or below which exports render synchronously
    #[serde(default = "default_sync_threshold")]
    pub sync_threshold: usize,

    /// Job record TTL in seconds, anchored at job creation
    #[serde(default = "default_job_ttl_secs")]
    pub job_ttl_secs: u64,
}

fn default_sync_threshold() -> usize {
    50
}
fn default_job_ttl_secs() -> u64 {
    3600
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sync_threshold: default_sync_threshold(),
            job_ttl_secs: default_job_ttl_secs(),
        }
    }
}

impl ExportConfig {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default = "default_sweeper_enabled")]
    pub enabled: bool,

    /// Sweep period in seconds
    #[serde(default = "default_sweeper_interval_secs")]
    pub interval_secs: u64,

    /// Devices idle for longer than this are flipped to inactive
    #[serde(default = "default_idle_after_secs")]
    pub idle_after_secs: u64,
}

fn default_sweeper_enabled() -> bool {
    true
}
fn default_sweeper_interval_secs() -> u64 {
    900 // 15 minutes
}
fn default_idle_after_secs() -> u64 {
    86_400 // 24 hours
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweeper_enabled(),
            interval_secs: default_sweeper_interval_secs(),
            idle_after_secs: default_idle_after_secs(),
        }
    }
}

/// Identity resolution configuration.
///
/// Maps bearer tokens to stable owner ids. Token issuance itself (JWT,
/// password hashing) lives outside this service; the server only needs the
/// resolver seam.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: HashMap<String, Uuid>,
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if pathbuf.exists() {
                    builder = builder.add_source(File::from(pathbuf));
                }
            }
            None => {
                let default_path = PathBuf::from("sensorgrid.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., SENSORGRID__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SENSORGRID")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
