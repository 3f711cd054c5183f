//! Error taxonomy for the gateway.
//!
//! `ProviderError` covers the network-client/provider boundary. `GatewayError`
//! covers the orchestrator/HTTP boundary and is the type the service shell
//! classifies into a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Errors raised while talking to an upstream site, independent of HTTP framing.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("browser navigation failed: {0}")]
    Browser(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("upstream returned a challenge page that could not be resolved")]
    Challenge,

    #[error("operation cancelled")]
    Cancelled,
}

/// Errors surfaced by the request orchestrator, one variant per §7 taxonomy entry.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid id: {0}")]
    InvalidInput(String),

    #[error("service busy")]
    Busy,

    #[error("not found")]
    NotFound,

    #[error("upstream error: {0}")]
    UpstreamTransient(#[from] ProviderError),

    #[error("cancelled")]
    Cancelled,

    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Busy => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::NotFound => StatusCode::OK, // envelope carries success:false, see §7
            GatewayError::UpstreamTransient(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if matches!(self, GatewayError::Internal(_)) {
            tracing::error!(event = "Internal", error = %self, "unhandled error in request path");
        }

        let body = ErrorEnvelope {
            success: false,
            error: self.to_string(),
            timestamp: chrono::Utc::now(),
        };

        (status, axum::Json(body)).into_response()
    }
}
