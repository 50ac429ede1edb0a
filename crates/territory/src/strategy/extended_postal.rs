use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::config::BoundaryData;
use crate::errors::TerritoryError;
use crate::models::{
    BoundaryLookupResult, Confidence, ExtensionRule, Granularity, NormalizedAddress, StrategyId,
    StrategyMetadata,
};

/// Uses the last digit of a `ZIP+4` extension as a proxy for the boundary.
///
/// Only applies to postal codes configured with extension granularity.
pub struct ExtendedPostalStrategy {
    data: Arc<BoundaryData>,
}

impl ExtendedPostalStrategy {
    pub fn new(data: Arc<BoundaryData>) -> Self {
        Self { data }
    }
}

fn selects_primary(rule: ExtensionRule, digit: u8) -> bool {
    match rule {
        ExtensionRule::Parity => digit % 2 == 0,
        ExtensionRule::Threshold { below } => digit < below,
    }
}

#[async_trait]
impl BoundaryStrategy for ExtendedPostalStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::ExtendedPostalCode
    }

    async fn attempt(
        &self,
        address: &NormalizedAddress,
        _ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        let extension = address.postal_extension.as_deref()?;
        let config = self.data.postal_code(&address.postal_code)?;
        if config.granularity != Granularity::Extension {
            return None;
        }

        let digit = extension.chars().last()?.to_digit(10)? as u8;
        let operator_id = if selects_primary(config.extension_rule, digit) {
            &config.primary
        } else {
            config.alternate_ids().next().unwrap_or(&config.primary)
        };

        let Some(operator) = self.data.operator(operator_id).cloned() else {
            return Some(Err(TerritoryError::Configuration(format!(
                "unknown operator {} for {}",
                operator_id, address.postal_code
            ))));
        };
        let alternates = self.data.alternates_for(&address.postal_code, &operator.id);

        Some(Ok(BoundaryLookupResult::new(
            self.id(),
            operator,
            Confidence::Medium,
            StrategyMetadata::ExtendedPostalCode {
                extension: extension.to_string(),
                rule: config.extension_rule,
                digit,
            },
        )
        .with_alternates(alternates)
        .with_data_as_of(self.data.data_as_of())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::address;
    use std::time::Duration;

    fn strategy() -> ExtendedPostalStrategy {
        ExtendedPostalStrategy::new(Arc::new(BoundaryData::bundled().unwrap()))
    }

    fn ctx() -> ResolveContext {
        ResolveContext::with_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_parity_rule() {
        let mut even = address("75034", "1 Main");
        even.postal_extension = Some("1234".to_string());
        let result = strategy().attempt(&even, &ctx()).await.unwrap().unwrap();
        assert_eq!(result.operator.id, "1039940674000");
        assert_eq!(result.confidence, Confidence::Medium);
        assert_eq!(result.alternates.len(), 1);

        let mut odd = even.clone();
        odd.postal_extension = Some("1235".to_string());
        let result = strategy().attempt(&odd, &ctx()).await.unwrap().unwrap();
        assert_eq!(result.operator.id, "007929441");
        assert_eq!(result.alternates[0].id, "1039940674000");
    }

    #[tokio::test]
    async fn test_threshold_rule() {
        let mut low = address("76063", "1 Main");
        low.postal_extension = Some("0004".to_string());
        let result = strategy().attempt(&low, &ctx()).await.unwrap().unwrap();
        assert_eq!(result.operator.id, "1039940674000");

        low.postal_extension = Some("0005".to_string());
        let result = strategy().attempt(&low, &ctx()).await.unwrap().unwrap();
        assert_eq!(result.operator.id, "007929441");
    }

    #[tokio::test]
    async fn test_declines_without_extension_or_granularity() {
        let plain = address("75034", "1 Main");
        assert!(strategy().attempt(&plain, &ctx()).await.is_none());

        let mut street_level = address("75001", "1 Main");
        street_level.postal_extension = Some("1234".to_string());
        assert!(strategy().attempt(&street_level, &ctx()).await.is_none());
    }
}
