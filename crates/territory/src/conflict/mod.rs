//! Conflict resolution across collected strategy outcomes.
//!
//! Only used when several strategies are consulted for the same address
//! (consensus mode, operator options). The first-match chain never needs it.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::TerritoryError;
use crate::models::{
    BoundaryLookupResult, Confidence, NormalizedAddress, ResolutionResult, StrategyId,
    TerritoryOperator,
};

/// Policy for picking one answer out of several candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Highest confidence weight wins; ties go to the first candidate seen.
    #[default]
    HighestConfidence,
    /// Resolved vs. not-resolved majority decides, then highest confidence.
    MajorityVote,
    /// Most recently dated data wins; ties go to the first candidate seen.
    LatestData,
}

impl ConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighestConfidence => "highest_confidence",
            Self::MajorityVote => "majority_vote",
            Self::LatestData => "latest_data",
        }
    }
}

/// One strategy's contribution: a lookup, or `None` when it declined or failed.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceOutcome {
    pub strategy: StrategyId,
    /// Age of the underlying data, taken from the lookup's `data_as_of`.
    /// Lookups that carry no date count as observed now.
    pub observed_at: DateTime<Utc>,
    pub lookup: Option<BoundaryLookupResult>,
}

impl SourceOutcome {
    pub fn resolved(lookup: BoundaryLookupResult) -> Self {
        Self {
            strategy: lookup.strategy,
            observed_at: lookup.data_as_of.unwrap_or_else(Utc::now),
            lookup: Some(lookup),
        }
    }

    pub fn unresolved(strategy: StrategyId) -> Self {
        Self {
            strategy,
            observed_at: Utc::now(),
            lookup: None,
        }
    }

    pub fn observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }
}

/// Combines collected outcomes into a single result.
///
/// Every resolved candidate that is not the winner contributes its operator
/// to the alternates. Warnings from all candidates are carried over.
pub fn resolve(
    outcomes: &[SourceOutcome],
    policy: ConflictPolicy,
    address: NormalizedAddress,
) -> Result<ResolutionResult, TerritoryError> {
    let candidates: Vec<(usize, &SourceOutcome, &BoundaryLookupResult)> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(index, outcome)| outcome.lookup.as_ref().map(|l| (index, outcome, l)))
        .collect();

    if candidates.is_empty() {
        return Err(TerritoryError::NoSourcesAvailable);
    }

    let mut demote = None;
    let winner = match policy {
        ConflictPolicy::HighestConfidence => highest_confidence(&candidates),
        ConflictPolicy::MajorityVote => {
            let resolved = candidates.len();
            let unresolved = outcomes.len() - resolved;
            if unresolved > resolved {
                demote = Some(format!(
                    "{} of {} sources could not resolve this address",
                    unresolved,
                    outcomes.len()
                ));
            }
            highest_confidence(&candidates)
        }
        ConflictPolicy::LatestData => latest(&candidates),
    };
    let (winner_index, _, lookup) = winner;
    debug!(
        "Conflict policy {} picked {} out of {} candidates",
        policy.as_str(),
        lookup.strategy,
        candidates.len()
    );

    let mut result = ResolutionResult::from_lookup(address, lookup.clone());
    for (index, _, other) in &candidates {
        if *index == winner_index {
            continue;
        }
        push_alternate(&mut result.alternates, &result.operator, &other.operator);
        for alternate in &other.alternates {
            push_alternate(&mut result.alternates, &result.operator, alternate);
        }
        for warning in &other.warnings {
            if !result.warnings.contains(warning) {
                result.warnings.push(warning.clone());
            }
        }
    }

    if let Some(warning) = demote {
        result.confidence = Confidence::Low;
        result.warnings.push(warning);
    }
    Ok(result)
}

fn highest_confidence<'a>(
    candidates: &[(usize, &'a SourceOutcome, &'a BoundaryLookupResult)],
) -> (usize, &'a SourceOutcome, &'a BoundaryLookupResult) {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.2.confidence.weight() > best.2.confidence.weight() {
            best = *candidate;
        }
    }
    best
}

fn latest<'a>(
    candidates: &[(usize, &'a SourceOutcome, &'a BoundaryLookupResult)],
) -> (usize, &'a SourceOutcome, &'a BoundaryLookupResult) {
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1.observed_at > best.1.observed_at {
            best = *candidate;
        }
    }
    best
}

fn push_alternate(
    alternates: &mut Vec<TerritoryOperator>,
    winner: &TerritoryOperator,
    candidate: &TerritoryOperator,
) {
    if candidate.id != winner.id && !alternates.iter().any(|a| a.id == candidate.id) {
        alternates.push(candidate.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrategyMetadata;
    use chrono::Duration;

    fn operator(id: &str) -> TerritoryOperator {
        TerritoryOperator {
            id: id.to_string(),
            name: format!("Operator {}", id),
            pricing_zone: "north".to_string(),
            tier: 1,
            priority_score: 1.0,
        }
    }

    fn lookup(strategy: StrategyId, operator_id: &str, confidence: Confidence) -> BoundaryLookupResult {
        BoundaryLookupResult::new(
            strategy,
            operator(operator_id),
            confidence,
            StrategyMetadata::PostalFallback {
                city: "Addison".to_string(),
            },
        )
    }

    fn address() -> NormalizedAddress {
        NormalizedAddress {
            house_number: Some("1".to_string()),
            street_name: "Main".to_string(),
            street_type: None,
            unit_type: None,
            unit_number: None,
            city: "Addison".to_string(),
            region: "TX".to_string(),
            postal_code: "75001".to_string(),
            postal_extension: None,
            display: "1 Main, Addison, TX 75001".to_string(),
            partial: false,
        }
    }

    #[test]
    fn test_no_outcomes_is_no_sources_available() {
        for policy in [
            ConflictPolicy::HighestConfidence,
            ConflictPolicy::MajorityVote,
            ConflictPolicy::LatestData,
        ] {
            assert_eq!(
                resolve(&[], policy, address()),
                Err(TerritoryError::NoSourcesAvailable)
            );
        }
    }

    #[test]
    fn test_only_unresolved_is_no_sources_available() {
        let outcomes = vec![SourceOutcome::unresolved(StrategyId::ExternalRegistry)];
        let err = resolve(&outcomes, ConflictPolicy::MajorityVote, address()).unwrap_err();
        assert_eq!(err.code(), "NO_SOURCES_AVAILABLE");
    }

    #[test]
    fn test_highest_confidence_prefers_weight_then_first_seen() {
        let outcomes = vec![
            SourceOutcome::resolved(lookup(StrategyId::MultiOperatorConfig, "A", Confidence::Medium)),
            SourceOutcome::resolved(lookup(StrategyId::PostalFallback, "B", Confidence::Low)),
            SourceOutcome::resolved(lookup(StrategyId::StreetLevel, "C", Confidence::Medium)),
        ];
        let result = resolve(&outcomes, ConflictPolicy::HighestConfidence, address()).unwrap();
        assert_eq!(result.operator.id, "A");
        assert_eq!(result.strategy, StrategyId::MultiOperatorConfig);
        let alternates: Vec<&str> = result.alternates.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(alternates, vec!["B", "C"]);
    }

    #[test]
    fn test_registry_only_wins_with_higher_confidence() {
        let registry = lookup(StrategyId::ExternalRegistry, "A", Confidence::Medium);
        let config = lookup(StrategyId::MultiOperatorConfig, "B", Confidence::Medium);

        // Equal weight: first seen wins, and strategy 4 is listed first here.
        let outcomes = vec![
            SourceOutcome::resolved(config.clone()),
            SourceOutcome::resolved(registry.clone()),
        ];
        let result = resolve(&outcomes, ConflictPolicy::HighestConfidence, address()).unwrap();
        assert_eq!(result.strategy, StrategyId::MultiOperatorConfig);

        let mut registry_high = registry;
        registry_high.confidence = Confidence::High;
        let outcomes = vec![
            SourceOutcome::resolved(config),
            SourceOutcome::resolved(registry_high),
        ];
        let result = resolve(&outcomes, ConflictPolicy::HighestConfidence, address()).unwrap();
        assert_eq!(result.strategy, StrategyId::ExternalRegistry);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn test_majority_vote_demotes_when_most_sources_fail() {
        let outcomes = vec![
            SourceOutcome::unresolved(StrategyId::ExternalRegistry),
            SourceOutcome::unresolved(StrategyId::ExtendedPostalCode),
            SourceOutcome::resolved(lookup(StrategyId::MultiOperatorConfig, "A", Confidence::Medium)),
        ];
        let result = resolve(&outcomes, ConflictPolicy::MajorityVote, address()).unwrap();
        assert_eq!(result.operator.id, "A");
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.warnings.iter().any(|w| w.contains("2 of 3")));
    }

    #[test]
    fn test_majority_vote_tie_counts_as_resolved() {
        let outcomes = vec![
            SourceOutcome::unresolved(StrategyId::ExternalRegistry),
            SourceOutcome::resolved(lookup(StrategyId::StreetLevel, "A", Confidence::Medium)),
        ];
        let result = resolve(&outcomes, ConflictPolicy::MajorityVote, address()).unwrap();
        assert_eq!(result.confidence, Confidence::Medium);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_latest_data_uses_observation_time() {
        let now = Utc::now();
        let outcomes = vec![
            SourceOutcome::resolved(lookup(StrategyId::ExternalRegistry, "A", Confidence::High))
                .observed_at(now - Duration::minutes(5)),
            SourceOutcome::resolved(lookup(StrategyId::PostalFallback, "B", Confidence::Low))
                .observed_at(now),
            SourceOutcome::resolved(lookup(StrategyId::StreetLevel, "C", Confidence::Medium))
                .observed_at(now),
        ];
        let result = resolve(&outcomes, ConflictPolicy::LatestData, address()).unwrap();
        assert_eq!(result.operator.id, "B");
    }

    #[test]
    fn test_resolved_outcome_takes_lookup_data_date() {
        let as_of = Utc::now() - Duration::days(30);
        let outcome = SourceOutcome::resolved(
            lookup(StrategyId::StreetLevel, "A", Confidence::Medium).with_data_as_of(as_of),
        );
        assert_eq!(outcome.observed_at, as_of);
    }

    #[test]
    fn test_alternates_never_repeat_winner() {
        let first = lookup(StrategyId::StreetLevel, "A", Confidence::Medium)
            .with_alternates(vec![operator("B")]);
        let second = lookup(StrategyId::MultiOperatorConfig, "A", Confidence::Medium)
            .with_alternates(vec![operator("B")])
            .with_warning("Provisional");
        let outcomes = vec![SourceOutcome::resolved(first), SourceOutcome::resolved(second)];
        let result = resolve(&outcomes, ConflictPolicy::HighestConfidence, address()).unwrap();
        assert_eq!(result.alternates.len(), 1);
        assert_eq!(result.alternates[0].id, "B");
        assert_eq!(result.warnings, vec!["Provisional".to_string()]);
    }

    #[test]
    fn test_policy_json_names() {
        let policy: ConflictPolicy = serde_json::from_str("\"latest_data\"").unwrap();
        assert_eq!(policy, ConflictPolicy::LatestData);
        assert_eq!(ConflictPolicy::MajorityVote.as_str(), "majority_vote");
    }
}
