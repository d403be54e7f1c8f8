use crate::handlers;
use crate::middleware;
use crate::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        // MFA enrollment
        .route("/api/mfa/enroll", post(handlers::mfa::enroll))
        .route(
            "/api/mfa/enroll/:factor_id/verify",
            post(handlers::mfa::verify_enrollment),
        )
        .route(
            "/api/mfa/enroll/:factor_id/cancel",
            post(handlers::mfa::cancel_enrollment),
        )
        // Sign-in step-up
        .route("/api/mfa/step-up/totp", post(handlers::mfa::step_up_totp))
        .route(
            "/api/mfa/step-up/backup-code",
            post(handlers::mfa::step_up_backup_code),
        )
        .route("/api/mfa/step-up/cancel", post(handlers::mfa::cancel_step_up))
        // Disable
        .route("/api/mfa/disable", post(handlers::mfa::disable))
        // Backup codes
        .route(
            "/api/mfa/backup-codes/remaining",
            get(handlers::mfa::backup_codes_remaining),
        )
        .route(
            "/api/mfa/backup-codes/regenerate",
            post(handlers::mfa::regenerate_backup_codes),
        )
        // Session records
        .route(
            "/api/sessions",
            get(handlers::sessions::list_sessions).post(handlers::sessions::record_session),
        )
        .route("/api/sessions/touch", post(handlers::sessions::touch_session))
        .route(
            "/api/sessions/:session_id/revoke",
            post(handlers::sessions::revoke_session),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
