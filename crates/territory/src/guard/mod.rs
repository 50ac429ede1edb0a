//! Protection for network-bound strategies.
//!
//! A [`SourceGuard`] combines a circuit breaker and a rate limiter so a
//! failing or throttled external source is skipped quickly instead of
//! slowing every resolution down.

mod circuit_breaker;
mod rate_limiter;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::RateLimiter;

use tokio::time::Instant;

use crate::errors::{RetryClass, TerritoryError};

pub struct SourceGuard {
    source: String,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
}

impl SourceGuard {
    pub fn new(source: impl Into<String>, requests_per_minute: u32) -> Self {
        Self::with_parts(
            source,
            CircuitBreaker::default(),
            RateLimiter::new(requests_per_minute),
        )
    }

    pub fn with_parts(source: impl Into<String>, breaker: CircuitBreaker, limiter: RateLimiter) -> Self {
        Self {
            source: source.into(),
            breaker,
            limiter,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Admits one call, or reports why it may not proceed.
    pub async fn admit(&self, deadline: Instant) -> Result<(), TerritoryError> {
        if !self.breaker.allows(&self.source) {
            return Err(TerritoryError::CircuitOpen {
                source_name: self.source.clone(),
            });
        }
        if !self.limiter.acquire_before(&self.source, deadline).await {
            return Err(TerritoryError::RateLimited {
                source_name: self.source.clone(),
            });
        }
        Ok(())
    }

    /// Feeds a call outcome back into the breaker.
    pub fn record<T>(&self, outcome: &Result<T, TerritoryError>) {
        match outcome {
            Ok(_) => self.breaker.record_success(&self.source),
            Err(err) => match err.retry_class() {
                RetryClass::FailoverWithPenalty => self.breaker.record_failure(&self.source),
                RetryClass::Never | RetryClass::NextStrategy | RetryClass::CircuitOpen => {}
            },
        }
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state(&self.source)
    }
}
