use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::confidence::Confidence;
use super::operator::TerritoryOperator;

/// Identifies one boundary strategy.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    ExternalRegistry,
    ExtendedPostalCode,
    StreetLevel,
    MultiOperatorConfig,
    PostalFallback,
}

impl StrategyId {
    /// Fixed priority order of the chain.
    pub const DEFAULT_ORDER: [StrategyId; 5] = [
        StrategyId::ExternalRegistry,
        StrategyId::ExtendedPostalCode,
        StrategyId::StreetLevel,
        StrategyId::MultiOperatorConfig,
        StrategyId::PostalFallback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExternalRegistry => "external_registry",
            Self::ExtendedPostalCode => "extended_postal_code",
            Self::StreetLevel => "street_level",
            Self::MultiOperatorConfig => "multi_operator_config",
            Self::PostalFallback => "postal_fallback",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::DEFAULT_ORDER
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the last digit of a postal extension selects an operator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExtensionRule {
    /// Even digit selects the primary operator, odd the first alternate.
    #[default]
    Parity,
    /// Digit below the threshold selects the primary operator.
    Threshold { below: u8 },
}

/// House-number parity constraint on a street rule.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseParity {
    Odd,
    Even,
}

impl HouseParity {
    pub fn matches(self, number: u32) -> bool {
        match self {
            Self::Odd => number % 2 == 1,
            Self::Even => number % 2 == 0,
        }
    }
}

/// Strategy-specific details attached to a lookup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyMetadata {
    ExternalRegistry {
        reference_id: Option<String>,
        registry_score: f64,
    },
    ExtendedPostalCode {
        extension: String,
        rule: ExtensionRule,
        digit: u8,
    },
    StreetLevel {
        pattern: String,
        house_number: Option<u32>,
        rule_index: usize,
    },
    MultiOperatorConfig {
        requires_address_validation: bool,
    },
    PostalFallback {
        city: String,
    },
}

/// Output of one strategy. Always wrapped into a `ResolutionResult`
/// before leaving the engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryLookupResult {
    pub strategy: StrategyId,
    pub operator: TerritoryOperator,
    pub confidence: Confidence,
    pub alternates: Vec<TerritoryOperator>,
    pub warnings: Vec<String>,
    pub metadata: StrategyMetadata,
    pub elapsed_ms: u64,
    /// When the source's answer was last known to be true: the registry's
    /// record time, or the as-of date of the static dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_as_of: Option<DateTime<Utc>>,
}

impl BoundaryLookupResult {
    pub fn new(
        strategy: StrategyId,
        operator: TerritoryOperator,
        confidence: Confidence,
        metadata: StrategyMetadata,
    ) -> Self {
        Self {
            strategy,
            operator,
            confidence,
            alternates: Vec::new(),
            warnings: Vec::new(),
            metadata,
            elapsed_ms: 0,
            data_as_of: None,
        }
    }

    pub fn with_data_as_of(mut self, data_as_of: DateTime<Utc>) -> Self {
        self.data_as_of = Some(data_as_of);
        self
    }

    pub fn with_alternates(mut self, alternates: Vec<TerritoryOperator>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_id_round_trip_through_parse() {
        for id in StrategyId::DEFAULT_ORDER {
            assert_eq!(StrategyId::parse(id.as_str()), Some(id));
        }
        assert_eq!(StrategyId::parse("STREET_LEVEL"), Some(StrategyId::StreetLevel));
        assert_eq!(StrategyId::parse("geocoder"), None);
    }

    #[test]
    fn test_house_parity() {
        assert!(HouseParity::Odd.matches(1235));
        assert!(!HouseParity::Odd.matches(1234));
        assert!(HouseParity::Even.matches(0));
    }

    #[test]
    fn test_extension_rule_json_shape() {
        let rule: ExtensionRule = serde_json::from_str(r#"{"mode":"threshold","below":5}"#).unwrap();
        assert_eq!(rule, ExtensionRule::Threshold { below: 5 });
        let rule: ExtensionRule = serde_json::from_str(r#"{"mode":"parity"}"#).unwrap();
        assert_eq!(rule, ExtensionRule::Parity);
    }
}
