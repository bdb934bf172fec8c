//! Error types and HTTP error mapping
//!
//! Every handler converts its failures into a [`GatewayError`] at the
//! boundary; nothing crosses the HTTP layer unhandled. Validation and
//! not-found problems carry a short machine-readable message for the client.
//! I/O and upstream failures are logged with context, and the client only
//! ever sees a generic message for them: raw filesystem error text is not
//! trusted as user-facing output.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed or missing required input (HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Referenced file does not exist (HTTP 404)
    #[error("{0}")]
    NotFound(String),

    /// Unexpected filesystem failure (HTTP 500)
    #[error("I/O failure during {operation} on {path}")]
    Io {
        /// What the gateway was doing when the failure happened
        operation: &'static str,
        /// The path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A bounded operation exceeded its deadline (HTTP 500)
    #[error("{0} timed out")]
    Timeout(&'static str),

    /// The backend origin could not be reached (HTTP 502)
    #[error("upstream request failed")]
    Upstream(#[from] reqwest::Error),

    /// Internal failure with no client-relevant detail (HTTP 500)
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    /// Builds an [`GatewayError::Io`] with operation and path context
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Self::Io {
                operation,
                path,
                source,
            } => {
                tracing::error!(%operation, path = %path.display(), error = %source, "filesystem operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage operation failed".to_string(),
                )
            }
            Self::Timeout(operation) => {
                tracing::error!(%operation, "operation exceeded its deadline");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Operation timed out".to_string(),
                )
            }
            Self::Upstream(source) => {
                tracing::error!(error = %source, "backend proxy request failed");
                (StatusCode::BAD_GATEWAY, "Backend unavailable".to_string())
            }
            Self::Internal(message) => {
                tracing::error!(error = %message, "internal gateway error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
