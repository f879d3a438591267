//! HTTP error mapping
//!
//! Bridge failures never echo process output: callers get the error kind and
//! exit code, while stderr and raw stdout stay in the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::aggregation::AggregationError;
use crate::bridge::BridgeError;

/// Errors returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Model invocation failed (400, 502 or 504)
    #[error("Prediction failed: {0}")]
    Bridge(#[from] BridgeError),

    /// Dashboard rollup failed (400 or 500)
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Prediction store read failed (500)
    #[error("Store error: {0}")]
    Store(#[from] carerisk_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": msg, "kind": "ValidationError" }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "error": msg }),
            ),
            ApiError::Bridge(e) => {
                error!(kind = e.kind(), error = %e, "Prediction request failed");
                if let Some(diagnostic) = e.diagnostic() {
                    debug!(kind = e.kind(), diagnostic, "Model process diagnostic output");
                }
                let status = match &e {
                    BridgeError::Validation(_) => StatusCode::BAD_REQUEST,
                    BridgeError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (
                    status,
                    json!({
                        "success": false,
                        "error": "Risk prediction failed",
                        "kind": e.kind(),
                        "exitCode": e.exit_code(),
                    }),
                )
            }
            ApiError::Aggregation(AggregationError::InvalidInput(msg)) => (
                StatusCode::BAD_REQUEST,
                json!({ "success": false, "error": msg, "kind": "ValidationError" }),
            ),
            ApiError::Aggregation(e) => {
                error!(kind = e.kind(), error = %e, "Dashboard query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Dashboard query failed", "kind": e.kind() }),
                )
            }
            ApiError::Store(e) => {
                warn!(error = %e, "Prediction store read failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "error": "Prediction store read failed" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
