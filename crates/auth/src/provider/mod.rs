pub mod hosted;
pub mod local;

use crate::context::UserContext;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tavola_models::{AssuranceLevel, AuthFactor};
use uuid::Uuid;

/// Provisioning material returned when a TOTP factor is enrolled. Shown to
/// the user once so they can register the secret with an authenticator app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotpProvisioning {
    pub factor_id: Uuid,
    /// Base32-encoded shared secret.
    pub secret: String,
    /// otpauth:// URI for authenticator apps.
    pub otpauth_uri: String,
    /// PNG rendering of the otpauth URI as a QR code.
    pub qr_png: Vec<u8>,
}

/// A pending challenge against a factor. A challenge must be created before
/// a code can be verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: Uuid,
    pub factor_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// The factor-management contract of the identity provider.
///
/// The provider owns factor records and session assurance; this crate only
/// depends on the semantics below. Errors surface as
/// [`AuthError::ExternalProviderError`](crate::AuthError::ExternalProviderError)
/// unless a variant is more specific (wrong code, unknown factor).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// All factors registered for the user, verified or not.
    async fn list_factors(&self, user: &UserContext) -> Result<Vec<AuthFactor>>;

    /// Register a new, unverified TOTP factor and return its provisioning
    /// material.
    async fn enroll_totp(
        &self,
        user: &UserContext,
        friendly_name: Option<&str>,
    ) -> Result<TotpProvisioning>;

    /// Open a challenge against a factor.
    async fn create_challenge(&self, user: &UserContext, factor_id: Uuid) -> Result<Challenge>;

    /// Verify a 6-digit code against an open challenge. On the first
    /// successful verification of an unverified factor the provider marks it
    /// verified; on a verified factor it elevates the session to AAL2.
    async fn verify_challenge(
        &self,
        user: &UserContext,
        factor_id: Uuid,
        challenge_id: Uuid,
        code: &str,
    ) -> Result<()>;

    /// Remove a factor. Verified or not.
    async fn unenroll_factor(&self, user: &UserContext, factor_id: Uuid) -> Result<()>;

    /// The provider's current assurance level for the user's session.
    async fn assurance_level(&self, user: &UserContext) -> Result<AssuranceLevel>;

    /// Terminate the user's provider session.
    async fn sign_out(&self, user: &UserContext) -> Result<()>;
}

/// The user's verified TOTP factor, if any. Shared lookup used by the
/// step-up and disable flows.
pub async fn find_verified_factor(
    provider: &dyn IdentityProvider,
    user: &UserContext,
) -> Result<Option<AuthFactor>> {
    let factors = provider.list_factors(user).await?;
    Ok(factors.into_iter().find(|f| f.is_verified()))
}
