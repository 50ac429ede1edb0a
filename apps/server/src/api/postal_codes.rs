use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use territory_core::{PostalCodeAnalysis, TerritoryOperator};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;
use crate::models::{WarmRequest, WarmResponse};

const MAX_WARM_CODES: usize = 5_000;

async fn analyze_postal_code(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PostalCodeAnalysis>> {
    let analysis = state.resolver.analyze_postal_code(&code).await?;
    Ok(Json(analysis))
}

async fn invalidate_postal_code(
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.resolver.invalidate_postal_code(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn warm_postal_codes(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WarmRequest>,
) -> ApiResult<Json<WarmResponse>> {
    if request.postal_codes.len() > MAX_WARM_CODES {
        return Err(ApiError::BadRequest(format!(
            "At most {} postal codes per request",
            MAX_WARM_CODES
        )));
    }
    let outcomes = state.resolver.warm_postal_codes(&request.postal_codes).await;
    let mut warmed = 0;
    let mut rejected = Vec::new();
    for (code, outcome) in request.postal_codes.iter().zip(outcomes) {
        match outcome {
            Ok(_) => warmed += 1,
            Err(_) => rejected.push(code.clone()),
        }
    }
    Ok(Json(WarmResponse { warmed, rejected }))
}

async fn get_operator(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TerritoryOperator>> {
    state
        .resolver
        .operator(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown operator {}", id)))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/postal-codes/warm", post(warm_postal_codes))
        .route(
            "/postal-codes/{code}",
            get(analyze_postal_code).delete(invalidate_postal_code),
        )
        .route("/operators/{id}", get(get_operator))
}
