use serde::{Deserialize, Serialize};
use territory_core::conflict::ConflictPolicy;
use territory_core::{RawAddress, ResolutionResult, TerritoryError};

use crate::error::ErrorBody;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(flatten)]
    pub address: RawAddress,
    #[serde(default)]
    pub bypass_cache: bool,
    /// Runs every strategy and picks with this policy.
    #[serde(default)]
    pub policy: Option<ConflictPolicy>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolveRequest {
    pub addresses: Vec<RawAddress>,
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// One slot of a bulk response, in request order.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolveItem {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResolutionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl BulkResolveItem {
    pub fn new(index: usize, outcome: Result<ResolutionResult, TerritoryError>) -> Self {
        match outcome {
            Ok(result) => Self {
                index,
                result: Some(result),
                error: None,
            },
            Err(err) => Self {
                index,
                result: None,
                error: Some(ErrorBody::from(&err)),
            },
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BulkResolveResponse {
    pub total: usize,
    pub resolved: usize,
    pub failed: usize,
    pub results: Vec<BulkResolveItem>,
}

impl BulkResolveResponse {
    pub fn from_outcomes(outcomes: Vec<Result<ResolutionResult, TerritoryError>>) -> Self {
        let results: Vec<BulkResolveItem> = outcomes
            .into_iter()
            .enumerate()
            .map(|(index, outcome)| BulkResolveItem::new(index, outcome))
            .collect();
        let resolved = results.iter().filter(|r| r.result.is_some()).count();
        Self {
            total: results.len(),
            resolved,
            failed: results.len() - resolved,
            results,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WarmRequest {
    pub postal_codes: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WarmResponse {
    pub warmed: usize,
    pub rejected: Vec<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCount {
    pub code: String,
    pub count: i64,
}
