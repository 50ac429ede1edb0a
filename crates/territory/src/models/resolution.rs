use serde::{Deserialize, Serialize};

use super::address::NormalizedAddress;
use super::confidence::Confidence;
use super::lookup::{BoundaryLookupResult, StrategyId};
use super::operator::{Granularity, TerritoryOperator};

/// What happened when the chain reached one strategy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Resolved,
    Declined,
    Failed { code: String, message: String },
    Skipped { reason: String },
}

/// Diagnostic record of one strategy attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyAttempt {
    pub strategy: StrategyId,
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// The externally visible answer for one address.
///
/// Constructed once per resolution and treated as immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub address: NormalizedAddress,
    pub operator: TerritoryOperator,
    pub confidence: Confidence,
    pub alternates: Vec<TerritoryOperator>,
    pub strategy: StrategyId,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
    #[serde(default)]
    pub attempts: Vec<StrategyAttempt>,
    #[serde(default)]
    pub from_cache: bool,
}

impl ResolutionResult {
    pub fn from_lookup(address: NormalizedAddress, lookup: BoundaryLookupResult) -> Self {
        Self {
            address,
            operator: lookup.operator,
            confidence: lookup.confidence,
            alternates: lookup.alternates,
            strategy: lookup.strategy,
            warnings: lookup.warnings,
            processing_time_ms: lookup.elapsed_ms,
            attempts: Vec::new(),
            from_cache: false,
        }
    }

    /// True when a human should confirm the operator.
    pub fn needs_confirmation(&self) -> bool {
        self.confidence == Confidence::Low || !self.alternates.is_empty()
    }
}

/// Answer of the cheap postal-code-only pre-check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostalCodeAnalysis {
    pub postal_code: String,
    pub is_multi_operator: bool,
    pub requires_address_validation: bool,
    pub granularity: Granularity,
    pub operator_candidates: Vec<TerritoryOperator>,
}

/// One selectable operator when a human must disambiguate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorOption {
    pub operator: TerritoryOperator,
    pub confidence: Confidence,
    pub recommended: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorOptions {
    pub options: Vec<OperatorOption>,
    pub help_text: String,
}
