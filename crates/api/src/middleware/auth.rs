use crate::handlers::ErrorResponse;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use tavola_auth::Claims;
use uuid::Uuid;

/// Authenticated user context, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub aal: Option<String>,
}

/// The raw bearer token of the calling session, kept for session-record
/// correlation (the token itself is never persisted).
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

type MiddlewareError = (StatusCode, Json<ErrorResponse>);

/// Extract the bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, MiddlewareError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "missing_auth_header",
                    "Authorization header is required",
                )),
            )
        })?
        .to_str()
        .map_err(|_| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(
                    "invalid_auth_header",
                    "Invalid Authorization header format",
                )),
            )
        })?;

    if !auth_header.starts_with("Bearer ") {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "invalid_auth_scheme",
                "Authorization header must use Bearer scheme",
            )),
        ));
    }

    Ok(auth_header[7..].to_string())
}

fn claims_to_user(claims: Claims) -> Result<AuthUser, MiddlewareError> {
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_token", "Malformed subject claim")),
        )
    })?;

    Ok(AuthUser {
        user_id,
        email: claims.email,
        aal: claims.aal,
    })
}

/// Validate the session token and attach [`AuthUser`] + [`BearerToken`] to
/// the request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, MiddlewareError> {
    let token = extract_bearer_token(request.headers())?;

    let claims = state.jwt.validate_access_token(&token).map_err(|e| {
        tracing::debug!("token validation failed: {}", e);
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("invalid_token", "Invalid or expired token")),
        )
    })?;

    let auth_user = claims_to_user(claims)?;

    request.extensions_mut().insert(auth_user);
    request.extensions_mut().insert(BearerToken(token));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc123");
    }

    #[test]
    fn test_missing_header_rejected() {
        let headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());
    }

    #[test]
    fn test_wrong_scheme_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic abc123"));
        assert!(extract_bearer_token(&headers).is_err());
    }
}
