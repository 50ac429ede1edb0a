use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::TtlTable;
use crate::conflict::ConflictPolicy;
use crate::errors::TerritoryError;
use crate::models::StrategyId;

/// Default timeout for network-bound strategies.
const DEFAULT_STRATEGY_TIMEOUT_MS: u64 = 5_000;

/// Default bulk chunk size.
const DEFAULT_BULK_BATCH_SIZE: usize = 10;

/// Default pause between bulk chunks.
const DEFAULT_BULK_BATCH_DELAY_MS: u64 = 100;

/// How the orchestrator turns strategies into an answer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Stop at the first strategy that produces a result.
    #[default]
    FirstMatch,
    /// Run every strategy and let the conflict resolver pick.
    Consensus { policy: ConflictPolicy },
}

/// Connection settings for the authoritative external registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRegistryConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Registry scores at or above this map to `high`, below to `medium`.
    #[serde(default = "default_high_confidence_threshold")]
    pub high_confidence_threshold: f64,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_high_confidence_threshold() -> f64 {
    0.8
}

fn default_requests_per_minute() -> u32 {
    60
}

impl ExternalRegistryConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            high_confidence_threshold: default_high_confidence_threshold(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

/// Cache sizing and tier settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    pub memory_max_entries: usize,
    pub sweep_interval_secs: u64,
    /// Directory for the static-file tier. Disabled when unset.
    pub static_dir: Option<PathBuf>,
    pub ttl: TtlTable,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_max_entries: 10_000,
            sweep_interval_secs: 60,
            static_dir: None,
            ttl: TtlTable::default(),
        }
    }
}

impl CacheConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Engine-wide settings. Every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub strategy_timeout_ms: u64,
    pub bulk_batch_size: usize,
    pub bulk_batch_delay_ms: u64,
    pub resolution_mode: ResolutionMode,
    /// Reorders or disables strategies. `None` keeps the default order.
    pub strategy_order: Option<Vec<StrategyId>>,
    pub external_registry: Option<ExternalRegistryConfig>,
    pub cache: CacheConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy_timeout_ms: DEFAULT_STRATEGY_TIMEOUT_MS,
            bulk_batch_size: DEFAULT_BULK_BATCH_SIZE,
            bulk_batch_delay_ms: DEFAULT_BULK_BATCH_DELAY_MS,
            resolution_mode: ResolutionMode::default(),
            strategy_order: None,
            external_registry: None,
            cache: CacheConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn strategy_timeout(&self) -> Duration {
        Duration::from_millis(self.strategy_timeout_ms)
    }

    pub fn bulk_batch_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_batch_delay_ms)
    }

    /// Strategy order with duplicates removed.
    pub fn strategy_order(&self) -> Vec<StrategyId> {
        let mut order = Vec::with_capacity(StrategyId::DEFAULT_ORDER.len());
        let configured = self
            .strategy_order
            .as_deref()
            .unwrap_or(&StrategyId::DEFAULT_ORDER);
        for id in configured {
            if !order.contains(id) {
                order.push(*id);
            }
        }
        order
    }

    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TerritoryError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            TerritoryError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            TerritoryError::Configuration(format!("invalid engine config {}: {}", path.display(), e))
        })
    }
}
