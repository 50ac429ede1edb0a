use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::config::BoundaryData;
use crate::errors::TerritoryError;
use crate::models::{
    BoundaryLookupResult, Confidence, NormalizedAddress, StrategyId, StrategyMetadata,
};

/// Last resort: postal-code range to city to historical operator.
///
/// Always `low` confidence. Declines only when the fallback data has a gap.
pub struct PostalFallbackStrategy {
    data: Arc<BoundaryData>,
}

impl PostalFallbackStrategy {
    pub fn new(data: Arc<BoundaryData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl BoundaryStrategy for PostalFallbackStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::PostalFallback
    }

    async fn attempt(
        &self,
        address: &NormalizedAddress,
        _ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        let numeric: u32 = address.postal_code.parse().ok()?;
        let range = self.data.fallback_for(numeric)?;
        let Some(operator) = self.data.operator(&range.operator).cloned() else {
            return Some(Err(TerritoryError::Configuration(format!(
                "fallback range {}-{} references unknown operator {}",
                range.start, range.end, range.operator
            ))));
        };
        let alternates = self.data.alternates_for(&address.postal_code, &operator.id);

        Some(Ok(BoundaryLookupResult::new(
            self.id(),
            operator,
            Confidence::Low,
            StrategyMetadata::PostalFallback {
                city: range.city.clone(),
            },
        )
        .with_alternates(alternates)
        .with_data_as_of(self.data.data_as_of())
        .with_warning(format!(
            "Operator estimated from the {} area; confirm with a full service address",
            range.city
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::address;
    use std::time::Duration;

    #[tokio::test]
    async fn test_every_region_code_resolves() {
        let data = Arc::new(BoundaryData::bundled().unwrap());
        let strategy = PostalFallbackStrategy::new(data.clone());
        let ctx = ResolveContext::with_timeout(Duration::from_secs(1));

        let region = data.region().clone();
        for range in &region.ranges {
            for code in (range.start..=range.end).step_by(97).chain([range.end]) {
                let postal = format!("{:05}", code);
                let result = strategy
                    .attempt(&address(&postal, "1 Main St"), &ctx)
                    .await
                    .unwrap_or_else(|| panic!("no fallback for {}", postal))
                    .unwrap();
                assert_eq!(result.confidence, Confidence::Low);
            }
        }
    }

    #[tokio::test]
    async fn test_outside_data_declines() {
        let strategy = PostalFallbackStrategy::new(Arc::new(BoundaryData::bundled().unwrap()));
        let ctx = ResolveContext::with_timeout(Duration::from_secs(1));
        assert!(strategy.attempt(&address("10001", "1 Main St"), &ctx).await.is_none());
    }
}
