// Application error type and its HTTP mapping
// API errors are returned as JSON: {"error": "..."}

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::catalog::QueryError;

#[derive(Debug)]
pub enum AppError {
    InternalServerError(anyhow::Error),
    Unauthorized(String),
    // Catalog store failed; distinct from a successful query with zero matches
    QueryFailed(QueryError),
}

impl From<QueryError> for AppError {
    fn from(error: QueryError) -> Self {
        AppError::QueryFailed(error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(e) => {
                // Log the detailed error here
                tracing::error!("Internal server error: {:?}", e);
                // Don't expose internal details to the client
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Unauthorized(message) => {
                tracing::warn!("Unauthorized access attempt: {}", message);
                (StatusCode::UNAUTHORIZED, message)
            }
            AppError::QueryFailed(e) => {
                tracing::error!("Catalog query failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Catalog query failed".to_string())
            }
        };

        (status, Json(json!({ "error": error_message }))).into_response()
    }
}
