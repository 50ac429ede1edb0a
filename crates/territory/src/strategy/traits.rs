use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::errors::TerritoryError;
use crate::models::{BoundaryLookupResult, NormalizedAddress, StrategyId};

/// Per-resolution context handed to every strategy.
#[derive(Clone, Copy, Debug)]
pub struct ResolveContext {
    /// Point after which network-bound work must stop.
    pub deadline: Instant,
}

impl ResolveContext {
    pub fn new(deadline: Instant) -> Self {
        Self { deadline }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(Instant::now() + timeout)
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// A copy whose deadline is at most `limit` from now.
    pub fn narrowed(&self, limit: Duration) -> Self {
        Self::new(self.deadline.min(Instant::now() + limit))
    }
}

/// One way of mapping an address to a territory operator.
///
/// Strategies are tried in priority order until one returns a result.
#[async_trait]
pub trait BoundaryStrategy: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Network-bound strategies are subject to the strategy timeout and the
    /// caller's deadline. Local strategies always run to completion.
    fn is_network_bound(&self) -> bool {
        false
    }

    /// Attempt a lookup.
    ///
    /// # Returns
    /// * `Some(Ok(result))` - resolved
    /// * `Some(Err(error))` - transient failure; the chain logs it and moves on
    /// * `None` - not applicable to this address (try next)
    async fn attempt(
        &self,
        address: &NormalizedAddress,
        ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>>;
}
