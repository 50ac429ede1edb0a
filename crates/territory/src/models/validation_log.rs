use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::confidence::Confidence;
use super::lookup::StrategyId;

/// Append-only audit record written once per resolution attempt.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationLog {
    pub postal_code: String,
    pub is_valid: bool,
    pub source: Option<StrategyId>,
    pub confidence: Option<Confidence>,
    pub operator_id: Option<String>,
    pub error_code: Option<String>,
    pub error: Option<String>,
    pub processing_time_ms: u64,
    pub from_cache: bool,
    pub logged_at: DateTime<Utc>,
}
