use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::config::BoundaryData;
use crate::errors::TerritoryError;
use crate::models::{
    BoundaryLookupResult, Confidence, NormalizedAddress, StrategyId, StrategyMetadata,
};

/// Returns the configured primary operator for a known postal code.
///
/// Confidence drops to `low` when the postal code is flagged as needing
/// address-level validation, marking the answer as provisional.
pub struct MultiOperatorStrategy {
    data: Arc<BoundaryData>,
}

impl MultiOperatorStrategy {
    pub fn new(data: Arc<BoundaryData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl BoundaryStrategy for MultiOperatorStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::MultiOperatorConfig
    }

    async fn attempt(
        &self,
        address: &NormalizedAddress,
        _ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        let config = self.data.postal_code(&address.postal_code)?;
        let Some(operator) = self.data.operator(&config.primary).cloned() else {
            return Some(Err(TerritoryError::Configuration(format!(
                "postal code {} has unknown primary operator {}",
                address.postal_code, config.primary
            ))));
        };
        let alternates = self.data.alternates_for(&address.postal_code, &operator.id);

        let requires_validation = config.requires_address_validation && !alternates.is_empty();
        let confidence = if requires_validation {
            Confidence::Low
        } else {
            Confidence::Medium
        };

        let mut result = BoundaryLookupResult::new(
            self.id(),
            operator,
            confidence,
            StrategyMetadata::MultiOperatorConfig {
                requires_address_validation: config.requires_address_validation,
            },
        )
        .with_alternates(alternates)
        .with_data_as_of(self.data.data_as_of());
        if requires_validation {
            result = result.with_warning("Operator is provisional; confirm with a full service address");
        }
        Some(Ok(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::address;
    use std::time::Duration;

    fn strategy() -> MultiOperatorStrategy {
        MultiOperatorStrategy::new(Arc::new(BoundaryData::bundled().unwrap()))
    }

    fn ctx() -> ResolveContext {
        ResolveContext::with_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_no_validation_required_is_medium() {
        let result = strategy()
            .attempt(&address("77581", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.operator.id, "957877905");
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.alternates.len(), 1);
        assert!(result.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_validation_required_is_low() {
        let result = strategy()
            .attempt(&address("77546", "1 Main St"), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_single_operator_code() {
        let result = strategy()
            .attempt(&address("78701", "100 Congress Ave"), &ctx())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.operator.id, "AE-0001");
        assert!(result.alternates.is_empty());
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[tokio::test]
    async fn test_unconfigured_code_declines() {
        assert!(strategy()
            .attempt(&address("79901", "1 Main St"), &ctx())
            .await
            .is_none());
    }
}
