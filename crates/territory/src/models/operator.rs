use serde::{Deserialize, Serialize};

/// Operator registry number (e.g. a DUNS-style identifier).
pub type OperatorId = String;

/// Regulated company that physically delivers power to an address.
///
/// Loaded from static configuration at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerritoryOperator {
    pub id: OperatorId,
    pub name: String,
    pub pricing_zone: String,
    /// Lower is higher priority for coverage builds.
    pub tier: u8,
    /// Tie-breaker among operators of the same tier. Higher wins.
    pub priority_score: f64,
}

impl TerritoryOperator {
    /// Ordering used when presenting several operators for the same code.
    pub fn cmp_priority(&self, other: &Self) -> std::cmp::Ordering {
        self.tier.cmp(&other.tier).then_with(|| {
            other
                .priority_score
                .partial_cmp(&self.priority_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

/// How much address detail a postal code needs before its operator is known.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// The postal code alone is enough.
    #[default]
    PostalCode,
    /// The 4-digit extension decides.
    Extension,
    /// The street and house number decide.
    Street,
}
