use std::sync::Arc;

use log::info;

use super::TerritoryResolver;
use crate::audit::{LogSink, ValidationLogSink};
use crate::cache::{CacheTier, MemoryTier, StaticFileTier, TieredCache};
use crate::config::{BoundaryData, EngineConfig};
use crate::errors::TerritoryError;
use crate::models::StrategyId;
use crate::strategy::{
    BoundaryStrategy, ExtendedPostalStrategy, ExternalRegistryStrategy, MultiOperatorStrategy,
    PostalFallbackStrategy, StrategyChain, StreetLevelStrategy,
};
use crate::validation::RegionValidator;

/// Assembles a [`TerritoryResolver`] from configuration and injected parts.
///
/// Nothing is global: every cache tier, sink and dataset is handed in here
/// and owned by the resolver.
#[derive(Default)]
pub struct TerritoryResolverBuilder {
    config: EngineConfig,
    data: Option<Arc<BoundaryData>>,
    tiers: Vec<Arc<dyn CacheTier>>,
    sinks: Vec<Arc<dyn ValidationLogSink>>,
    strategies: Option<Vec<Arc<dyn BoundaryStrategy>>>,
}

impl TerritoryResolverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Boundary dataset. Defaults to the bundled reference data.
    pub fn data(mut self, data: Arc<BoundaryData>) -> Self {
        self.data = Some(data);
        self
    }

    /// Adds a slower cache tier behind the in-process one. Tiers are read
    /// in the order they are added; a configured static directory is last.
    pub fn cache_tier(mut self, tier: Arc<dyn CacheTier>) -> Self {
        self.tiers.push(tier);
        self
    }

    /// Adds an audit sink. Defaults to [`LogSink`] when none is added.
    pub fn audit_sink(mut self, sink: Arc<dyn ValidationLogSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Replaces the configured strategy chain.
    pub fn strategies(mut self, strategies: Vec<Arc<dyn BoundaryStrategy>>) -> Self {
        self.strategies = Some(strategies);
        self
    }

    pub fn build(self) -> Result<TerritoryResolver, TerritoryError> {
        let data = match self.data {
            Some(data) => data,
            None => Arc::new(BoundaryData::bundled()?),
        };
        let config = self.config;
        if config.bulk_batch_size == 0 {
            return Err(TerritoryError::Configuration(
                "bulkBatchSize must be at least 1".to_string(),
            ));
        }

        let mut registry = None;
        let strategies = match self.strategies {
            Some(strategies) => strategies,
            None => {
                let mut strategies: Vec<Arc<dyn BoundaryStrategy>> = Vec::new();
                for id in config.strategy_order() {
                    match id {
                        StrategyId::ExternalRegistry => match &config.external_registry {
                            Some(registry_config) => {
                                let strategy = Arc::new(ExternalRegistryStrategy::new(
                                    registry_config.clone(),
                                    data.clone(),
                                ));
                                registry = Some(strategy.clone());
                                strategies.push(strategy);
                            }
                            None => info!("External registry not configured, strategy skipped"),
                        },
                        StrategyId::ExtendedPostalCode => {
                            strategies.push(Arc::new(ExtendedPostalStrategy::new(data.clone())))
                        }
                        StrategyId::StreetLevel => {
                            strategies.push(Arc::new(StreetLevelStrategy::new(data.clone())))
                        }
                        StrategyId::MultiOperatorConfig => {
                            strategies.push(Arc::new(MultiOperatorStrategy::new(data.clone())))
                        }
                        StrategyId::PostalFallback => {
                            strategies.push(Arc::new(PostalFallbackStrategy::new(data.clone())))
                        }
                    }
                }
                strategies
            }
        };
        let chain = StrategyChain::new(strategies, config.strategy_timeout());

        let memory = Arc::new(MemoryTier::new(config.cache.memory_max_entries));
        let mut cache = TieredCache::new(memory.clone(), config.cache.ttl.clone());
        for tier in self.tiers {
            cache = cache.with_tier(tier);
        }
        if let Some(dir) = &config.cache.static_dir {
            cache = cache.with_tier(Arc::new(StaticFileTier::new(dir.clone())));
        }

        let sweeper = tokio::runtime::Handle::try_current()
            .is_ok()
            .then(|| memory.spawn_sweeper(config.cache.sweep_interval()));

        let sinks = if self.sinks.is_empty() {
            vec![Arc::new(LogSink) as Arc<dyn ValidationLogSink>]
        } else {
            self.sinks
        };

        info!(
            "Territory resolver ready: strategies [{}], cache tiers [{}], {} operators, {} configured postal codes",
            chain
                .ids()
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            cache.tier_names().join(", "),
            data.operator_count(),
            data.postal_code_count(),
        );

        Ok(TerritoryResolver {
            validator: RegionValidator::new(data.region().clone()),
            config,
            data,
            chain,
            registry,
            cache: Arc::new(cache),
            sinks,
            sweeper,
        })
    }
}
