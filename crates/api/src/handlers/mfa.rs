use crate::handlers::{auth_error, ErrorResponse};
use crate::middleware::auth::AuthUser;
use crate::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tavola_auth::{
    find_verified_factor, DisableFlow, EnrollmentFlow, StepUpFlow, StepUpOutcome, UserContext,
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub friendly_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub factor_id: Uuid,
    pub secret: String,
    pub otpauth_uri: String,
    /// Base64 PNG for the enrollment dialog.
    pub qr_png: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CodeRequest {
    #[validate(length(min = 6, max = 6, message = "code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BackupCodeRequest {
    #[validate(length(min = 8, message = "backup code is too short"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct BackupCodesResponse {
    pub codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RemainingResponse {
    pub remaining: i64,
    pub low: bool,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn validation_error(err: validator::ValidationErrors) -> HandlerError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("validation_error", &err.to_string())),
    )
}

fn user_context(auth_user: &AuthUser) -> UserContext {
    UserContext::new(auth_user.user_id, auth_user.email.clone())
}

/// Start TOTP enrollment
/// POST /api/mfa/enroll
pub async fn enroll(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<EnrollRequest>,
) -> Result<Json<EnrollResponse>, HandlerError> {
    let user = user_context(&auth_user);

    let mut flow = EnrollmentFlow::new(state.provider.as_ref(), &state.backup_codes);
    let provisioning = flow
        .begin(&user, request.friendly_name.as_deref())
        .await
        .map_err(auth_error)?;

    Ok(Json(EnrollResponse {
        factor_id: provisioning.factor_id,
        secret: provisioning.secret,
        otpauth_uri: provisioning.otpauth_uri,
        qr_png: base64::engine::general_purpose::STANDARD.encode(provisioning.qr_png),
    }))
}

/// Confirm the pending factor with a live code; returns the one-time
/// plaintext backup codes
/// POST /api/mfa/enroll/:factor_id/verify
pub async fn verify_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(factor_id): Path<Uuid>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<BackupCodesResponse>, HandlerError> {
    request.validate().map_err(validation_error)?;
    let user = user_context(&auth_user);

    let mut flow =
        EnrollmentFlow::resume_awaiting(state.provider.as_ref(), &state.backup_codes, factor_id);
    let codes = flow
        .submit_code(&user, &request.code)
        .await
        .map_err(auth_error)?;

    Ok(Json(BackupCodesResponse { codes }))
}

/// Abandon a pending enrollment
/// POST /api/mfa/enroll/:factor_id/cancel
pub async fn cancel_enrollment(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(factor_id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let user = user_context(&auth_user);

    let mut flow =
        EnrollmentFlow::resume_awaiting(state.provider.as_ref(), &state.backup_codes, factor_id);
    flow.cancel(&user);

    Ok(StatusCode::NO_CONTENT)
}

/// Step up the session with a TOTP code
/// POST /api/mfa/step-up/totp
pub async fn step_up_totp(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CodeRequest>,
) -> Result<Json<StepUpOutcome>, HandlerError> {
    request.validate().map_err(validation_error)?;
    let user = user_context(&auth_user);

    let mut flow = StepUpFlow::new(state.provider.as_ref(), &state.backup_codes);
    let outcome = flow
        .submit_totp(&user, &request.code)
        .await
        .map_err(auth_error)?;

    Ok(Json(outcome))
}

/// Step up the session with a single-use backup code
/// POST /api/mfa/step-up/backup-code
pub async fn step_up_backup_code(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<BackupCodeRequest>,
) -> Result<Json<StepUpOutcome>, HandlerError> {
    request.validate().map_err(validation_error)?;
    let user = user_context(&auth_user);

    let mut flow = StepUpFlow::new(state.provider.as_ref(), &state.backup_codes);
    let outcome = flow
        .submit_backup_code(&user, &request.code)
        .await
        .map_err(auth_error)?;

    Ok(Json(outcome))
}

/// Abort a pending step-up and sign the session out
/// POST /api/mfa/step-up/cancel
pub async fn cancel_step_up(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<StatusCode, HandlerError> {
    let user = user_context(&auth_user);

    let mut flow = StepUpFlow::new(state.provider.as_ref(), &state.backup_codes);
    flow.cancel(&user).await.map_err(auth_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Disable MFA after re-verifying a current code
/// POST /api/mfa/disable
pub async fn disable(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CodeRequest>,
) -> Result<StatusCode, HandlerError> {
    request.validate().map_err(validation_error)?;
    let user = user_context(&auth_user);

    let flow = DisableFlow::new(state.provider.as_ref(), &state.backup_codes);
    flow.disable(&user, &request.code).await.map_err(auth_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Count of unused backup codes
/// GET /api/mfa/backup-codes/remaining
pub async fn backup_codes_remaining(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<RemainingResponse>, HandlerError> {
    let user = user_context(&auth_user);

    let remaining = state
        .backup_codes
        .count_remaining(&user)
        .await
        .map_err(auth_error)?;
    let low = state
        .backup_codes
        .running_low(&user)
        .await
        .map_err(auth_error)?;

    Ok(Json(RemainingResponse { remaining, low }))
}

/// Replace the backup-code set; returns the new plaintext codes once
/// POST /api/mfa/backup-codes/regenerate
pub async fn regenerate_backup_codes(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<BackupCodesResponse>, HandlerError> {
    let user = user_context(&auth_user);

    // Codes only make sense as a fallback for a verified factor
    find_verified_factor(state.provider.as_ref(), &user)
        .await
        .map_err(auth_error)?
        .ok_or_else(|| auth_error(tavola_auth::AuthError::NotEnrolled))?;

    let codes = state
        .backup_codes
        .generate(&user)
        .await
        .map_err(auth_error)?;

    Ok(Json(BackupCodesResponse { codes }))
}
