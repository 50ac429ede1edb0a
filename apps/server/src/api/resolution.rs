use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use territory_core::{OperatorOptions, RawAddress, ResolutionResult, ResolveOptions};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use crate::models::{BulkResolveRequest, BulkResolveResponse, ResolveRequest};

/// Upper bound on addresses per bulk request.
pub const MAX_BULK_ADDRESSES: usize = 1_000;

async fn resolve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResolveRequest>,
) -> ApiResult<Json<ResolutionResult>> {
    let options = ResolveOptions {
        bypass_cache: request.bypass_cache,
        policy: request.policy,
        ..ResolveOptions::default()
    };
    let result = state.resolver.resolve_with(&request.address, options).await?;
    Ok(Json(result))
}

async fn resolve_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkResolveRequest>,
) -> ApiResult<Json<BulkResolveResponse>> {
    if request.addresses.len() > MAX_BULK_ADDRESSES {
        return Err(ApiError::BadRequest(format!(
            "At most {} addresses per request, got {}",
            MAX_BULK_ADDRESSES,
            request.addresses.len()
        )));
    }
    if request.batch_size == Some(0) {
        return Err(ApiError::BadRequest("batchSize must be at least 1".to_string()));
    }

    let outcomes = state
        .resolver
        .resolve_bulk(&request.addresses, request.batch_size)
        .await;
    let response = BulkResolveResponse::from_outcomes(outcomes);
    tracing::info!(
        "Bulk resolution: {} resolved, {} failed",
        response.resolved,
        response.failed
    );
    Ok(Json(response))
}

async fn operator_options(
    State(state): State<Arc<AppState>>,
    Json(address): Json<RawAddress>,
) -> ApiResult<Json<OperatorOptions>> {
    let options = state.resolver.operator_options(&address).await?;
    Ok(Json(options))
}

async fn invalidate(
    State(state): State<Arc<AppState>>,
    Json(address): Json<RawAddress>,
) -> ApiResult<axum::http::StatusCode> {
    state.resolver.invalidate(&address).await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/resolve", post(resolve))
        .route("/resolve/bulk", post(resolve_bulk))
        .route("/resolve/invalidate", post(invalidate))
        .route("/operator-options", post(operator_options))
}
