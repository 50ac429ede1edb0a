use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8088";
const DEFAULT_DB_PATH: &str = "./territory-data/territory.db";
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_LOG_RETENTION_DAYS: i64 = 90;

/// Process settings read from `TERRITORY_*` environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    /// Directory with boundary JSON files. Uses the bundled dataset when unset.
    pub data_dir: Option<PathBuf>,
    /// Static-file cache tier directory.
    pub cache_dir: Option<PathBuf>,
    /// JSON file with engine settings.
    pub engine_config: Option<PathBuf>,
    pub registry_url: Option<String>,
    pub registry_api_key: Option<String>,
    pub redis_url: Option<String>,
    pub request_timeout: Duration,
    pub log_retention_days: i64,
    pub cors_allow_origins: Vec<String>,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, raw)),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = parsed(
            "TERRITORY_LISTEN_ADDR",
            DEFAULT_LISTEN_ADDR
                .parse::<SocketAddr>()
                .context("default listen address")?,
        )?;
        let request_timeout_ms = parsed("TERRITORY_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        Ok(Self {
            listen_addr,
            db_path: var("TERRITORY_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            data_dir: var("TERRITORY_DATA_DIR").map(PathBuf::from),
            cache_dir: var("TERRITORY_CACHE_DIR").map(PathBuf::from),
            engine_config: var("TERRITORY_ENGINE_CONFIG").map(PathBuf::from),
            registry_url: var("TERRITORY_REGISTRY_URL"),
            registry_api_key: var("TERRITORY_REGISTRY_API_KEY"),
            redis_url: var("TERRITORY_REDIS_URL"),
            request_timeout: Duration::from_millis(request_timeout_ms),
            log_retention_days: parsed("TERRITORY_LOG_RETENTION_DAYS", DEFAULT_LOG_RETENTION_DAYS)?,
            cors_allow_origins: var("TERRITORY_CORS_ALLOW_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}
