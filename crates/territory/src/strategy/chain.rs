//! Ordered strategy chain.
//!
//! `run` stops at the first strategy that produces a result. `collect_all`
//! consults every strategy concurrently for consensus mode. In both cases a
//! failing or timed-out strategy is recorded and treated as declined.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};
use tokio::time::Instant;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::conflict::SourceOutcome;
use crate::errors::{RetryClass, TerritoryError};
use crate::models::{
    AttemptOutcome, BoundaryLookupResult, NormalizedAddress, StrategyAttempt, StrategyId,
};

/// Result of a first-match run.
#[derive(Clone, Debug)]
pub struct ChainRun {
    pub lookup: BoundaryLookupResult,
    pub attempts: Vec<StrategyAttempt>,
    pub warnings: Vec<String>,
}

/// Result of consulting every strategy.
#[derive(Clone, Debug, Default)]
pub struct CollectedRun {
    pub outcomes: Vec<SourceOutcome>,
    pub attempts: Vec<StrategyAttempt>,
    pub warnings: Vec<String>,
}

struct Attempt {
    result: Option<BoundaryLookupResult>,
    record: StrategyAttempt,
    warning: Option<String>,
}

pub struct StrategyChain {
    strategies: Vec<Arc<dyn BoundaryStrategy>>,
    timeout: Duration,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Arc<dyn BoundaryStrategy>>, timeout: Duration) -> Self {
        Self { strategies, timeout }
    }

    pub fn ids(&self) -> Vec<StrategyId> {
        self.strategies.iter().map(|s| s.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// First-match resolution.
    pub async fn run(
        &self,
        address: &NormalizedAddress,
        ctx: &ResolveContext,
    ) -> Result<ChainRun, TerritoryError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut warnings = Vec::new();

        for strategy in &self.strategies {
            let attempt = self.attempt(strategy.as_ref(), address, ctx).await;
            attempts.push(attempt.record);
            warnings.extend(attempt.warning);

            if let Some(mut lookup) = attempt.result {
                lookup.warnings.extend(warnings.iter().cloned());
                return Ok(ChainRun {
                    lookup,
                    attempts,
                    warnings,
                });
            }
        }

        warn!(
            "Every strategy declined postal code {}; check the fallback data",
            address.postal_code
        );
        Err(TerritoryError::AllStrategiesFailed {
            postal_code: address.postal_code.clone(),
        })
    }

    /// Consults every strategy concurrently. Outcomes keep chain order.
    pub async fn collect_all(&self, address: &NormalizedAddress, ctx: &ResolveContext) -> CollectedRun {
        let attempts = self
            .strategies
            .iter()
            .map(|strategy| self.attempt(strategy.as_ref(), address, ctx));

        let mut run = CollectedRun::default();
        for attempt in join_all(attempts).await {
            let strategy = attempt.record.strategy;
            run.attempts.push(attempt.record);
            run.warnings.extend(attempt.warning);
            run.outcomes.push(match attempt.result {
                Some(lookup) => SourceOutcome::resolved(lookup),
                None => SourceOutcome::unresolved(strategy),
            });
        }
        run
    }

    async fn attempt(
        &self,
        strategy: &dyn BoundaryStrategy,
        address: &NormalizedAddress,
        ctx: &ResolveContext,
    ) -> Attempt {
        let id = strategy.id();
        let started = Instant::now();

        let outcome = if strategy.is_network_bound() {
            if ctx.is_expired() {
                return Attempt {
                    result: None,
                    record: StrategyAttempt {
                        strategy: id,
                        outcome: AttemptOutcome::Skipped {
                            reason: "deadline exceeded".to_string(),
                        },
                        elapsed_ms: 0,
                    },
                    warning: None,
                };
            }
            let scoped = ctx.narrowed(self.timeout);
            match tokio::time::timeout(scoped.remaining(), strategy.attempt(address, &scoped)).await {
                Ok(outcome) => outcome,
                Err(_) => Some(Err(TerritoryError::ExternalServiceTimeout {
                    source_name: id.to_string(),
                })),
            }
        } else {
            strategy.attempt(address, ctx).await
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Some(Ok(mut lookup)) => {
                debug!("{} resolved {} in {}ms", id, address.postal_code, elapsed_ms);
                lookup.elapsed_ms = elapsed_ms;
                Attempt {
                    result: Some(lookup),
                    record: StrategyAttempt {
                        strategy: id,
                        outcome: AttemptOutcome::Resolved,
                        elapsed_ms,
                    },
                    warning: None,
                }
            }
            Some(Err(err)) if err.retry_class() == RetryClass::CircuitOpen => {
                debug!("{} skipped: {}", id, err);
                Attempt {
                    result: None,
                    record: StrategyAttempt {
                        strategy: id,
                        outcome: AttemptOutcome::Skipped {
                            reason: "circuit open".to_string(),
                        },
                        elapsed_ms,
                    },
                    warning: None,
                }
            }
            Some(Err(err)) => {
                warn!("{} failed, falling through: {}", id, err);
                Attempt {
                    result: None,
                    record: StrategyAttempt {
                        strategy: id,
                        outcome: AttemptOutcome::Failed {
                            code: err.code().to_string(),
                            message: err.to_string(),
                        },
                        elapsed_ms,
                    },
                    warning: Some(format!("{} unavailable ({})", id, err.code())),
                }
            }
            None => {
                debug!("{} declined {}", id, address.postal_code);
                Attempt {
                    result: None,
                    record: StrategyAttempt {
                        strategy: id,
                        outcome: AttemptOutcome::Declined,
                        elapsed_ms,
                    },
                    warning: None,
                }
            }
        }
    }
}
