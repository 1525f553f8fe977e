//! Maps `ContinuumError` (spec §7) onto the HTTP status table in spec §6.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use continuum_core::ContinuumError;
use serde_json::json;

pub struct ApiError {
    status: StatusCode,
    message: String,
    retry_after: Option<std::time::Duration>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into(), retry_after: None }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNPROCESSABLE_ENTITY, message: message.into(), retry_after: None }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self { status: StatusCode::UNAUTHORIZED, message: message.into(), retry_after: None }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self { status: StatusCode::FORBIDDEN, message: message.into(), retry_after: None }
    }

    pub fn rate_limited(retry_after: std::time::Duration) -> Self {
        Self { status: StatusCode::TOO_MANY_REQUESTS, message: "rate limited".to_string(), retry_after: Some(retry_after) }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into(), retry_after: None }
    }
}

impl From<ContinuumError> for ApiError {
    fn from(err: ContinuumError) -> Self {
        match err {
            ContinuumError::Validation(msg) => Self { status: StatusCode::UNPROCESSABLE_ENTITY, message: msg, retry_after: None },
            ContinuumError::NotFound(msg) => Self { status: StatusCode::NOT_FOUND, message: msg, retry_after: None },
            ContinuumError::TenantForbidden(msg) => Self { status: StatusCode::FORBIDDEN, message: msg, retry_after: None },
            ContinuumError::RateLimited { retry_after } => {
                Self { status: StatusCode::TOO_MANY_REQUESTS, message: "rate limited".to_string(), retry_after: Some(retry_after) }
            }
            // StorageUnavailable, CacheUnavailable, ProviderUnavailable, InvariantViolation,
            // TimedOut: none of these should leak internals to the caller (spec §7).
            other => {
                tracing::error!(error = %other, "internal error");
                Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: "internal error".to_string(), retry_after: None }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        let mut response = (self.status, body).into_response();
        if let Some(retry_after) = self.retry_after {
            let value: Result<axum::http::HeaderValue, _> = retry_after.as_secs().max(1).to_string().parse();
            if let Ok(value) = value {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}
