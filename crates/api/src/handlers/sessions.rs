use crate::handlers::{auth_error, ErrorResponse};
use crate::middleware::auth::{AuthUser, BearerToken};
use crate::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tavola_auth::UserContext;
use tavola_models::SessionRecord;
use uuid::Uuid;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn user_context(auth_user: &AuthUser) -> UserContext {
    UserContext::new(auth_user.user_id, auth_user.email.clone())
}

/// List the user's session records, current first
/// GET /api/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<SessionRecord>>, HandlerError> {
    let user = user_context(&auth_user);
    let sessions = state.sessions.list(&user).await.map_err(auth_error)?;
    Ok(Json(sessions))
}

/// Record the calling session as the user's current one
/// POST /api/sessions
pub async fn record_session(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
    headers: HeaderMap,
) -> Result<Json<SessionRecord>, HandlerError> {
    let user = user_context(&auth_user);
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let session = state
        .sessions
        .record_sign_in(&user, &token, user_agent)
        .await
        .map_err(auth_error)?;

    Ok(Json(session))
}

/// Bump last-activity for the calling session
/// POST /api/sessions/touch
pub async fn touch_session(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Extension(BearerToken(token)): Extension<BearerToken>,
) -> Result<StatusCode, HandlerError> {
    let user = user_context(&auth_user);
    state
        .sessions
        .touch(&user, &token)
        .await
        .map_err(auth_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark a session record revoked (bookkeeping only; the provider session
/// stays valid)
/// POST /api/sessions/:session_id/revoke
pub async fn revoke_session(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionRecord>, HandlerError> {
    let user = user_context(&auth_user);
    let session = state
        .sessions
        .revoke(&user, session_id)
        .await
        .map_err(auth_error)?;
    Ok(Json(session))
}
