use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::{Duration, Utc};
use serde::Serialize;
use territory_core::EngineHealth;

use crate::error::ApiResult;
use crate::main_lib::AppState;
use crate::models::ErrorCount;

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub engine: EngineHealth,
    /// Failures by taxonomy code over the last 24 hours.
    pub recent_errors: Vec<ErrorCount>,
}

async fn get_health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let since = Utc::now() - Duration::hours(24);
    let recent_errors = match state.validation_logs.error_counts_since(since) {
        Ok(counts) => counts
            .into_iter()
            .map(|(code, count)| ErrorCount { code, count })
            .collect(),
        Err(e) => {
            tracing::warn!("Could not read validation log counts: {}", e);
            Vec::new()
        }
    };

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        engine: state.resolver.health(),
        recent_errors,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}
