pub mod health;
pub mod mfa;
pub mod sessions;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tavola_auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Map core errors onto the wire. Authentication failures keep their inline
/// message; provider and database failures collapse to a generic one.
pub fn auth_error(err: AuthError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        AuthError::InvalidMfaCode => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_code", "Invalid verification code")),
        ),
        AuthError::InvalidBackupCode => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "invalid_backup_code",
                "Invalid or already used backup code",
            )),
        ),
        AuthError::ValidationError(message) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("validation_error", &message)),
        ),
        AuthError::NotEnrolled | AuthError::FactorNotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("factor_not_found", "No matching MFA factor")),
        ),
        AuthError::InvalidFlowState(message) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("invalid_state", &message)),
        ),
        AuthError::InvalidToken(_) | AuthError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_token", "Invalid or expired token")),
        ),
        AuthError::ExternalProviderError(message) => {
            tracing::error!("identity provider failure: {}", message);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(
                    "provider_error",
                    "The identity provider could not complete the request",
                )),
            )
        }
        other => {
            tracing::error!("internal error: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("internal_error", "Something went wrong")),
            )
        }
    }
}
