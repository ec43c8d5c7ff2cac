//! HTTP error mapping.
//!
//! Every failure surfaces to the caller as a structured `{"detail": ...}`
//! body: 400 for malformed input, 503 for missing reference data (the
//! caller can retry after uploading), 502 for upstream judge failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use advisor_core::engine::EngineError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    UpstreamFailure(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NoPrice { .. } => ApiError::ServiceUnavailable(err.to_string()),
            EngineError::Provider(e) => ApiError::UpstreamFailure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::provider::ProviderError;

    #[test]
    fn engine_failures_map_to_their_status_class() {
        let no_price: ApiError = EngineError::NoPrice {
            ticker: "AAPL".into(),
            as_of: "2025-08-25".into(),
        }
        .into();
        assert!(matches!(no_price, ApiError::ServiceUnavailable(_)));

        let upstream: ApiError = EngineError::Provider(ProviderError::Status(500)).into();
        assert!(matches!(upstream, ApiError::UpstreamFailure(_)));
    }
}
