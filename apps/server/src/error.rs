use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use territory_core::TerritoryError;

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON error body returned to callers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl From<&TerritoryError> for ErrorBody {
    fn from(err: &TerritoryError) -> Self {
        // Only validator messages are safe to echo back verbatim.
        let message = if err.is_input_error() {
            err.to_string()
        } else {
            match err {
                TerritoryError::AllStrategiesFailed { .. } | TerritoryError::NoSourcesAvailable => {
                    "The service territory for this address could not be determined".to_string()
                }
                _ => "Territory resolution is temporarily unavailable".to_string(),
            }
        };
        Self {
            code: err.code().to_string(),
            message,
            suggestions: err.suggestions(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Territory(#[from] TerritoryError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub fn status_for(err: &TerritoryError) -> StatusCode {
    if err.is_input_error() {
        return StatusCode::BAD_REQUEST;
    }
    match err {
        TerritoryError::AllStrategiesFailed { .. } | TerritoryError::NoSourcesAvailable => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Territory(err) => {
                if !err.is_input_error() {
                    tracing::error!("Resolution failed: {}", err);
                }
                (status_for(err), ErrorBody::from(err))
            }
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: message.clone(),
                    suggestions: Vec::new(),
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: message.clone(),
                    suggestions: Vec::new(),
                },
            ),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR".to_string(),
                        message: "Internal server error".to_string(),
                        suggestions: Vec::new(),
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
