use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::flows::validate_totp_input;
use crate::mfa::manager::BackupCodeManager;
use crate::provider::{find_verified_factor, IdentityProvider};

/// Turns MFA off: re-verify a current code, unenroll the factor, delete the
/// backup codes.
pub struct DisableFlow<'a> {
    provider: &'a dyn IdentityProvider,
    codes: &'a BackupCodeManager,
}

impl<'a> DisableFlow<'a> {
    pub fn new(provider: &'a dyn IdentityProvider, codes: &'a BackupCodeManager) -> Self {
        Self { provider, codes }
    }

    /// Requires a currently valid 6-digit code before anything destructive
    /// happens. A wrong code leaves the factor and all codes untouched.
    ///
    /// Factor removal and code deletion cannot share a transaction (the
    /// factor lives at the provider), so the order is: unenroll first, then
    /// delete codes. If deletion fails the error propagates and the caller
    /// may retry; `delete_all` is idempotent, so the retry is safe.
    pub async fn disable(&self, user: &UserContext, code: &str) -> Result<()> {
        validate_totp_input(code)?;

        let factor = find_verified_factor(self.provider, user)
            .await?
            .ok_or(AuthError::NotEnrolled)?;

        let challenge = self.provider.create_challenge(user, factor.id).await?;
        self.provider
            .verify_challenge(user, factor.id, challenge.id, code)
            .await?;

        self.provider.unenroll_factor(user, factor.id).await?;
        tracing::info!(user_id = %user.user_id, factor_id = %factor.id, "TOTP factor unenrolled");

        if let Err(e) = self.codes.delete_all(user).await {
            tracing::error!(
                user_id = %user.user_id,
                error = %e,
                "factor removed but backup-code cleanup failed, retry needed"
            );
            return Err(e);
        }

        Ok(())
    }
}
