//! Resolution orchestrator.
//!
//! [`TerritoryResolver`] sequences validation, normalization, cache lookup,
//! the strategy chain, conflict resolution, cache population and audit
//! logging for every request. It holds no global state; build one per
//! process with [`TerritoryResolverBuilder`] and share it behind an `Arc`.

mod builder;
mod stage;

pub use builder::TerritoryResolverBuilder;
pub use stage::ResolutionStage;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, warn};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audit::ValidationLogSink;
use crate::cache::{
    CacheCategory, CacheKey, CacheStats, TieredCache, ANALYSIS_NAMESPACE,
};
use crate::config::{BoundaryData, EngineConfig, ResolutionMode};
use crate::conflict::{self, ConflictPolicy};
use crate::errors::TerritoryError;
use crate::guard::CircuitState;
use crate::models::{
    Confidence, Granularity, NormalizedAddress, OperatorOption, OperatorOptions,
    PostalCodeAnalysis, RawAddress, ResolutionResult, StrategyId, TerritoryOperator,
    ValidationLog,
};
use crate::normalize::normalize;
use crate::strategy::{CollectedRun, ExternalRegistryStrategy, ResolveContext, StrategyChain};
use crate::validation::RegionValidator;
use stage::StageTracker;

/// Namespace for cached operator lists per postal code.
const BOUNDARY_NAMESPACE: &str = "boundary";

/// Per-call overrides.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolveOptions {
    /// Skip the cache read. The fresh answer is still written back.
    pub bypass_cache: bool,
    /// Caller deadline for network-bound strategies.
    pub deadline: Option<Instant>,
    /// Run every strategy and resolve conflicts with this policy.
    pub policy: Option<ConflictPolicy>,
}

impl ResolveOptions {
    pub fn bypass_cache() -> Self {
        Self {
            bypass_cache: true,
            ..Self::default()
        }
    }
}

/// Snapshot for health endpoints.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineHealth {
    pub cache: CacheStats,
    pub cache_tiers: Vec<&'static str>,
    pub strategies: Vec<StrategyId>,
    /// `None` when no external registry is configured.
    pub registry_circuit: Option<CircuitState>,
    pub operators: usize,
    pub configured_postal_codes: usize,
}

pub struct TerritoryResolver {
    config: EngineConfig,
    data: Arc<BoundaryData>,
    validator: RegionValidator,
    chain: StrategyChain,
    registry: Option<Arc<ExternalRegistryStrategy>>,
    cache: Arc<TieredCache>,
    sinks: Vec<Arc<dyn ValidationLogSink>>,
    sweeper: Option<JoinHandle<()>>,
}

impl Drop for TerritoryResolver {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}

fn category_for(strategy: StrategyId) -> CacheCategory {
    match strategy {
        StrategyId::ExternalRegistry => CacheCategory::ExternalRegistry,
        StrategyId::PostalFallback => CacheCategory::PostalFallback,
        StrategyId::ExtendedPostalCode
        | StrategyId::StreetLevel
        | StrategyId::MultiOperatorConfig => CacheCategory::AddressResolution,
    }
}

fn merge_warnings(into: &mut Vec<String>, extra: Vec<String>) {
    for warning in extra {
        if !into.contains(&warning) {
            into.push(warning);
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

impl TerritoryResolver {
    pub fn builder() -> TerritoryResolverBuilder {
        TerritoryResolverBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn data(&self) -> &BoundaryData {
        &self.data
    }

    /// Resolves one address with default options.
    pub async fn resolve(&self, raw: &RawAddress) -> Result<ResolutionResult, TerritoryError> {
        self.resolve_with(raw, ResolveOptions::default()).await
    }

    pub async fn resolve_with(
        &self,
        raw: &RawAddress,
        options: ResolveOptions,
    ) -> Result<ResolutionResult, TerritoryError> {
        let started = Instant::now();
        let postal_code = raw.postal_code.trim().to_string();
        let mut tracker = StageTracker::new(&postal_code);

        let outcome = self.run_pipeline(raw, options, started, &mut tracker).await;
        if let Err(err) = &outcome {
            if !err.is_input_error() {
                warn!(
                    "Resolution for {} failed during {}: {}",
                    postal_code,
                    tracker.stage(),
                    err
                );
            }
            tracker.advance(ResolutionStage::Error);
        }
        self.audit(&postal_code, &outcome, started).await;
        outcome
    }

    async fn run_pipeline(
        &self,
        raw: &RawAddress,
        options: ResolveOptions,
        started: Instant,
        tracker: &mut StageTracker<'_>,
    ) -> Result<ResolutionResult, TerritoryError> {
        let validated = self.validator.validate(raw)?;

        tracker.advance(ResolutionStage::Normalizing);
        let address = normalize(&validated, self.validator.region());

        tracker.advance(ResolutionStage::CacheCheck);
        let key = CacheKey::for_address(&address);
        if !options.bypass_cache {
            if let Some(mut cached) = self.cache.get::<ResolutionResult>(&key).await {
                tracker.advance(ResolutionStage::Done);
                cached.from_cache = true;
                cached.processing_time_ms = elapsed_ms(started);
                return Ok(cached);
            }
        }

        tracker.advance(ResolutionStage::StrategyChain);
        let ctx = self.context(options.deadline);
        let policy = match (options.policy, self.config.resolution_mode) {
            (Some(policy), _) => Some(policy),
            (None, ResolutionMode::Consensus { policy }) => Some(policy),
            (None, ResolutionMode::FirstMatch) => None,
        };

        let mut result = match policy {
            None => {
                let run = self.chain.run(&address, &ctx).await?;
                tracker.advance(ResolutionStage::ConflictResolution);
                let mut result = ResolutionResult::from_lookup(address, run.lookup);
                merge_warnings(&mut result.warnings, run.warnings);
                result.attempts = run.attempts;
                result
            }
            Some(policy) => {
                let run = self.chain.collect_all(&address, &ctx).await;
                tracker.advance(ResolutionStage::ConflictResolution);
                let mut result = conflict::resolve(&run.outcomes, policy, address)?;
                merge_warnings(&mut result.warnings, run.warnings);
                result.attempts = run.attempts;
                result
            }
        };
        result.warnings.extend(validated.warnings);
        result.processing_time_ms = elapsed_ms(started);

        tracker.advance(ResolutionStage::CachePopulate);
        self.cache
            .set(&key, &result, category_for(result.strategy))
            .await;

        tracker.advance(ResolutionStage::Done);
        Ok(result)
    }

    /// Resolves many addresses in chunks of `batch_size` (default from
    /// config). Addresses within a chunk run concurrently; chunks are
    /// separated by the configured delay. Output order matches input order.
    pub async fn resolve_bulk(
        &self,
        addresses: &[RawAddress],
        batch_size: Option<usize>,
    ) -> Vec<Result<ResolutionResult, TerritoryError>> {
        self.batched(addresses, batch_size, |raw| self.resolve(raw))
            .await
    }

    /// Cheap postal-code-only pre-check.
    pub async fn analyze_postal_code(
        &self,
        postal_code: &str,
    ) -> Result<PostalCodeAnalysis, TerritoryError> {
        let validated = self.validator.validate_postal_code(postal_code)?;
        let key = CacheKey::for_postal_code(ANALYSIS_NAMESPACE, &validated.code);
        if let Some(analysis) = self.cache.get::<PostalCodeAnalysis>(&key).await {
            return Ok(analysis);
        }

        let operator_candidates = self.operators_for_postal_code(&validated.code).await;
        let analysis = match self.data.postal_code(&validated.code) {
            Some(config) => PostalCodeAnalysis {
                postal_code: validated.code.clone(),
                is_multi_operator: config.is_multi_operator(),
                requires_address_validation: config.requires_address_validation,
                granularity: config.granularity,
                operator_candidates,
            },
            None => PostalCodeAnalysis {
                postal_code: validated.code.clone(),
                is_multi_operator: operator_candidates.len() > 1,
                requires_address_validation: false,
                granularity: Granularity::PostalCode,
                operator_candidates,
            },
        };

        self.cache
            .set(&key, &analysis, CacheCategory::PostalAnalysis)
            .await;
        Ok(analysis)
    }

    /// Runs `analyze_postal_code` over `codes` with the bulk batching rules.
    pub async fn warm_postal_codes(
        &self,
        codes: &[String],
    ) -> Vec<Result<PostalCodeAnalysis, TerritoryError>> {
        self.batched(codes, None, |code| self.analyze_postal_code(code))
            .await
    }

    /// Runs every strategy for an address and returns all outcomes.
    pub async fn collect_candidates(
        &self,
        raw: &RawAddress,
    ) -> Result<(NormalizedAddress, CollectedRun), TerritoryError> {
        let validated = self.validator.validate(raw)?;
        let address = normalize(&validated, self.validator.region());
        let run = self.chain.collect_all(&address, &self.context(None)).await;
        Ok((address, run))
    }

    /// Candidate operators for a human to pick from.
    pub async fn operator_options(
        &self,
        raw: &RawAddress,
    ) -> Result<OperatorOptions, TerritoryError> {
        let (address, run) = self.collect_candidates(raw).await?;
        let postal_code = address.postal_code.clone();
        let best = conflict::resolve(&run.outcomes, ConflictPolicy::HighestConfidence, address)?;

        let mut options: Vec<OperatorOption> = Vec::new();
        let mut offer = |operator: &TerritoryOperator, confidence: Confidence| {
            match options.iter_mut().find(|o| o.operator.id == operator.id) {
                Some(existing) if confidence > existing.confidence => {
                    existing.confidence = confidence
                }
                Some(_) => {}
                None => options.push(OperatorOption {
                    operator: operator.clone(),
                    confidence,
                    recommended: false,
                }),
            }
        };

        for lookup in run.outcomes.iter().filter_map(|o| o.lookup.as_ref()) {
            offer(&lookup.operator, lookup.confidence);
            for alternate in &lookup.alternates {
                offer(alternate, Confidence::Low);
            }
        }
        for operator in self.data.operators_for_postal_code(&postal_code) {
            offer(&operator, Confidence::Low);
        }

        for option in options.iter_mut() {
            option.recommended = option.operator.id == best.operator.id;
        }
        options.sort_by(|a, b| {
            b.recommended
                .cmp(&a.recommended)
                .then(b.confidence.cmp(&a.confidence))
                .then(a.operator.cmp_priority(&b.operator))
        });

        let help_text = if options.len() > 1 {
            format!(
                "More than one utility delivers power in {}. Pick the company named on your electricity bill; if unsure, choose {}.",
                postal_code, best.operator.name
            )
        } else {
            format!("{} delivers power to this address.", best.operator.name)
        };

        Ok(OperatorOptions { options, help_text })
    }

    /// Removes the cached resolution for an address from every tier.
    pub async fn invalidate(&self, raw: &RawAddress) -> Result<(), TerritoryError> {
        let validated = self.validator.validate(raw)?;
        let address = normalize(&validated, self.validator.region());
        self.cache.invalidate(&CacheKey::for_address(&address)).await;
        Ok(())
    }

    /// Removes the cached pre-check and operator list for a postal code.
    pub async fn invalidate_postal_code(&self, postal_code: &str) -> Result<(), TerritoryError> {
        let validated = self.validator.validate_postal_code(postal_code)?;
        for namespace in [ANALYSIS_NAMESPACE, BOUNDARY_NAMESPACE] {
            self.cache
                .invalidate(&CacheKey::for_postal_code(namespace, &validated.code))
                .await;
        }
        Ok(())
    }

    pub fn operator(&self, id: &str) -> Option<&TerritoryOperator> {
        self.data.operator(id)
    }

    /// Operators serving a postal code, primary first. Cached as static
    /// boundary data.
    pub async fn operators_for_postal_code(&self, postal_code: &str) -> Vec<TerritoryOperator> {
        let key = CacheKey::for_postal_code(BOUNDARY_NAMESPACE, postal_code);
        if let Some(operators) = self.cache.get::<Vec<TerritoryOperator>>(&key).await {
            return operators;
        }
        let operators = self.data.operators_for_postal_code(postal_code);
        if !operators.is_empty() {
            self.cache
                .set(&key, &operators, CacheCategory::StaticBoundary)
                .await;
        }
        operators
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn health(&self) -> EngineHealth {
        EngineHealth {
            cache: self.cache.stats(),
            cache_tiers: self.cache.tier_names(),
            strategies: self.chain.ids(),
            registry_circuit: self.registry.as_ref().map(|r| r.circuit_state()),
            operators: self.data.operator_count(),
            configured_postal_codes: self.data.postal_code_count(),
        }
    }

    fn context(&self, deadline: Option<Instant>) -> ResolveContext {
        match deadline {
            Some(deadline) => ResolveContext::new(deadline),
            None => ResolveContext::with_timeout(self.config.strategy_timeout()),
        }
    }

    async fn batched<'a, I, T, F, Fut>(
        &self,
        items: &'a [I],
        batch_size: Option<usize>,
        f: F,
    ) -> Vec<Result<T, TerritoryError>>
    where
        F: Fn(&'a I) -> Fut,
        Fut: Future<Output = Result<T, TerritoryError>>,
    {
        let size = batch_size.unwrap_or(self.config.bulk_batch_size).max(1);
        let delay: Duration = self.config.bulk_batch_delay();
        let mut results = Vec::with_capacity(items.len());

        for (index, chunk) in items.chunks(size).enumerate() {
            if index > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!("Processing batch {} ({} items)", index + 1, chunk.len());
            results.extend(join_all(chunk.iter().map(&f)).await);
        }
        results
    }

    async fn audit(
        &self,
        postal_code: &str,
        outcome: &Result<ResolutionResult, TerritoryError>,
        started: Instant,
    ) {
        let log = match outcome {
            Ok(result) => ValidationLog {
                postal_code: result.address.postal_code.clone(),
                is_valid: true,
                source: Some(result.strategy),
                confidence: Some(result.confidence),
                operator_id: Some(result.operator.id.clone()),
                error_code: None,
                error: None,
                processing_time_ms: result.processing_time_ms,
                from_cache: result.from_cache,
                logged_at: Utc::now(),
            },
            Err(err) => ValidationLog {
                postal_code: postal_code.to_string(),
                is_valid: !err.is_input_error(),
                source: None,
                confidence: None,
                operator_id: None,
                error_code: Some(err.code().to_string()),
                error: Some(err.to_string()),
                processing_time_ms: elapsed_ms(started),
                from_cache: false,
                logged_at: Utc::now(),
            },
        };

        let writes = self.sinks.iter().map(|sink| sink.record(log.clone()));
        for result in join_all(writes).await {
            if let Err(err) = result {
                warn!("Audit sink failed for {}: {}", postal_code, err);
            }
        }
    }
}
