use std::sync::Arc;

use territory_core::audit::{LogSink, ValidationLogSink};
use territory_core::config::{BoundaryData, EngineConfig, ExternalRegistryConfig};
use territory_core::TerritoryResolver;
use territory_storage_sqlite::{SqliteCacheTier, SqliteStorage, ValidationLogRepository};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub struct AppState {
    pub resolver: Arc<TerritoryResolver>,
    pub cache_tier: Arc<SqliteCacheTier>,
    pub validation_logs: Arc<ValidationLogRepository>,
    pub log_retention_days: i64,
}

/// Installs the global subscriber. Library `log` records are bridged in.
pub fn init_tracing() {
    let log_format = std::env::var("TERRITORY_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

fn engine_config(config: &Config) -> anyhow::Result<EngineConfig> {
    let mut engine = match &config.engine_config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(url) = &config.registry_url {
        let mut registry = engine
            .external_registry
            .take()
            .unwrap_or_else(|| ExternalRegistryConfig::new(url.clone()));
        registry.base_url = url.clone();
        if config.registry_api_key.is_some() {
            registry.api_key = config.registry_api_key.clone();
        }
        engine.external_registry = Some(registry);
    }
    if let Some(dir) = &config.cache_dir {
        engine.cache.static_dir = Some(dir.clone());
    }
    Ok(engine)
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let storage = SqliteStorage::open(&config.db_path)?;
    tracing::info!("Database path in use: {}", config.db_path);

    let data = match &config.data_dir {
        Some(dir) => BoundaryData::from_dir(dir)?,
        None => BoundaryData::bundled()?,
    };

    let cache_tier = Arc::new(storage.cache_tier());
    let validation_logs = Arc::new(storage.validation_logs());

    let mut builder = TerritoryResolver::builder()
        .config(engine_config(config)?)
        .data(Arc::new(data));

    #[cfg(feature = "cache-redis")]
    {
        if let Some(url) = &config.redis_url {
            let redis = territory_core::cache::RedisTier::connect(url, "territory").await?;
            builder = builder.cache_tier(Arc::new(redis));
            tracing::info!("Redis cache tier enabled");
        }
    }
    #[cfg(not(feature = "cache-redis"))]
    {
        if config.redis_url.is_some() {
            tracing::warn!("TERRITORY_REDIS_URL is set but the server was built without cache-redis");
        }
    }

    builder = builder
        .cache_tier(cache_tier.clone())
        .audit_sink(validation_logs.clone() as Arc<dyn ValidationLogSink>)
        .audit_sink(Arc::new(LogSink));

    let resolver = builder.build()?;

    Ok(Arc::new(AppState {
        resolver: Arc::new(resolver),
        cache_tier,
        validation_logs,
        log_retention_days: config.log_retention_days,
    }))
}
