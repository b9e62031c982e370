//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::ValidationErrors;
use services::{IdentityError, ServiceError};

const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// API-level error type that maps to HTTP responses.
///
/// Client errors carry a message that is safe to show. Internal errors are
/// logged with their detail and answered with a generic body.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Field-level validation failed.
    Validation(ValidationErrors),
    /// Uniqueness rule or state guard blocked the request.
    Conflict(String),
    /// Missing, unknown or expired bearer token.
    Unauthorized(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "One or more validation errors occurred.",
                    "errors": errors,
                }),
            ),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, error_body(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body(INTERNAL_ERROR_MESSAGE.to_string()),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(msg) => ApiError::NotFound(msg),
            ServiceError::BadRequest(msg) => ApiError::BadRequest(msg),
            ServiceError::Validation(errors) => ApiError::Validation(errors),
            ServiceError::Conflict(msg) => ApiError::Conflict(msg),
            ServiceError::Store(err) => ApiError::Internal(err.to_string()),
            ServiceError::Identity(err) => err.into(),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidToken | IdentityError::TokenExpired => {
                ApiError::Unauthorized(err.to_string())
            }
            IdentityError::UserNotFound(_) => ApiError::NotFound(err.to_string()),
            IdentityError::DuplicateEmail(_) => ApiError::Conflict(err.to_string()),
            IdentityError::Unavailable(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_status_codes() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                ServiceError::Validation(ValidationErrors::new()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Identity(IdentityError::TokenExpired),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ServiceError::Store(store::StoreError::InvalidData("secret detail".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
