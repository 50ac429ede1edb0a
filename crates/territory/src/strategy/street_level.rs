use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{BoundaryStrategy, ResolveContext};
use crate::config::BoundaryData;
use crate::errors::TerritoryError;
use crate::models::{
    BoundaryLookupResult, Confidence, Granularity, NormalizedAddress, StrategyId, StrategyMetadata,
};

/// Matches the street against per-postal-code rules. First match wins.
pub struct StreetLevelStrategy {
    data: Arc<BoundaryData>,
}

impl StreetLevelStrategy {
    pub fn new(data: Arc<BoundaryData>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl BoundaryStrategy for StreetLevelStrategy {
    fn id(&self) -> StrategyId {
        StrategyId::StreetLevel
    }

    async fn attempt(
        &self,
        address: &NormalizedAddress,
        _ctx: &ResolveContext,
    ) -> Option<Result<BoundaryLookupResult, TerritoryError>> {
        let config = self.data.postal_code(&address.postal_code)?;
        if config.granularity != Granularity::Street || address.street_name.is_empty() {
            return None;
        }

        let street = address.full_street();
        let house_number = address.house_number_value();
        let (rule_index, matched) = self
            .data
            .street_rules(&address.postal_code)
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(&street, house_number))?;

        let Some(operator) = self.data.operator(&matched.rule.operator).cloned() else {
            return Some(Err(TerritoryError::Configuration(format!(
                "street rule for {} references unknown operator {}",
                address.postal_code, matched.rule.operator
            ))));
        };
        let alternates = self.data.alternates_for(&address.postal_code, &operator.id);

        Some(Ok(BoundaryLookupResult::new(
            self.id(),
            operator,
            Confidence::Medium,
            StrategyMetadata::StreetLevel {
                pattern: matched.rule.pattern.clone(),
                house_number,
                rule_index,
            },
        )
        .with_alternates(alternates)
        .with_data_as_of(self.data.data_as_of())))
    }
}
