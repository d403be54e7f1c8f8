use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::flows::validate_totp_input;
use crate::mfa::manager::BackupCodeManager;
use crate::provider::{IdentityProvider, TotpProvisioning};
use uuid::Uuid;

/// Enrollment progress. Terminal states are `Verified` and `Cancelled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentState {
    Idle,
    Enrolling,
    AwaitingVerification { factor_id: Uuid },
    Verified { factor_id: Uuid },
    Cancelled,
}

/// Drives TOTP factor enrollment against the identity provider.
///
/// `idle → enrolling → awaiting_verification → verified`, or `cancelled`
/// from anywhere before verification. One transition method per event; the
/// flow holds no UI concerns.
pub struct EnrollmentFlow<'a> {
    provider: &'a dyn IdentityProvider,
    codes: &'a BackupCodeManager,
    state: EnrollmentState,
}

impl<'a> EnrollmentFlow<'a> {
    pub fn new(provider: &'a dyn IdentityProvider, codes: &'a BackupCodeManager) -> Self {
        Self {
            provider,
            codes,
            state: EnrollmentState::Idle,
        }
    }

    /// Rebuild a flow that is waiting for the user's first code, e.g. on the
    /// next HTTP request of a multi-request enrollment.
    pub fn resume_awaiting(
        provider: &'a dyn IdentityProvider,
        codes: &'a BackupCodeManager,
        factor_id: Uuid,
    ) -> Self {
        Self {
            provider,
            codes,
            state: EnrollmentState::AwaitingVerification { factor_id },
        }
    }

    pub fn state(&self) -> &EnrollmentState {
        &self.state
    }

    /// Request a new unverified TOTP factor from the provider. On provider
    /// failure the flow falls back to `Idle` so the user can start over.
    pub async fn begin(
        &mut self,
        user: &UserContext,
        friendly_name: Option<&str>,
    ) -> Result<TotpProvisioning> {
        if self.state != EnrollmentState::Idle {
            return Err(AuthError::InvalidFlowState(
                "Enrollment already in progress".to_string(),
            ));
        }

        self.state = EnrollmentState::Enrolling;
        match self.provider.enroll_totp(user, friendly_name).await {
            Ok(provisioning) => {
                self.state = EnrollmentState::AwaitingVerification {
                    factor_id: provisioning.factor_id,
                };
                Ok(provisioning)
            }
            Err(e) => {
                self.state = EnrollmentState::Idle;
                Err(e)
            }
        }
    }

    /// Confirm the pending factor with a live 6-digit code. On success the
    /// provider marks the factor verified and a fresh batch of backup codes
    /// is generated and returned, the only time their plaintext exists.
    ///
    /// A wrong or expired code leaves the flow in `AwaitingVerification`;
    /// the user may retry without limit (rate limiting is the provider's
    /// concern, not this flow's).
    pub async fn submit_code(&mut self, user: &UserContext, code: &str) -> Result<Vec<String>> {
        let factor_id = match self.state {
            EnrollmentState::AwaitingVerification { factor_id } => factor_id,
            _ => {
                return Err(AuthError::InvalidFlowState(
                    "No factor awaiting verification".to_string(),
                ))
            }
        };

        validate_totp_input(code)?;

        let challenge = self.provider.create_challenge(user, factor_id).await?;
        self.provider
            .verify_challenge(user, factor_id, challenge.id, code)
            .await?;

        self.state = EnrollmentState::Verified { factor_id };
        tracing::info!(user_id = %user.user_id, %factor_id, "TOTP factor verified");

        self.codes.generate(user).await
    }

    /// Abandon enrollment. Only local state is discarded; if a factor was
    /// already registered it stays behind at the provider, unverified.
    pub fn cancel(&mut self, user: &UserContext) {
        if let EnrollmentState::AwaitingVerification { factor_id } = self.state {
            tracing::warn!(
                user_id = %user.user_id,
                %factor_id,
                "enrollment cancelled, unverified factor left at provider"
            );
        }
        self.state = EnrollmentState::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::local::{current_code, LocalProvider};
    use crate::testing::InMemoryBackupCodeStore;
    use std::sync::Arc;
    use tavola_models::FactorStatus;

    fn setup() -> (LocalProvider, BackupCodeManager, UserContext) {
        let provider = LocalProvider::new("Tavola");
        let codes = BackupCodeManager::new(Arc::new(InMemoryBackupCodeStore::new()));
        let user = UserContext::new(uuid::Uuid::new_v4(), "guest@tavola.example");
        (provider, codes, user)
    }

    #[tokio::test]
    async fn test_full_enrollment_produces_backup_codes() {
        let (provider, codes, user) = setup();
        let mut flow = EnrollmentFlow::new(&provider, &codes);

        let provisioning = flow.begin(&user, Some("Phone")).await.unwrap();
        assert!(matches!(
            flow.state(),
            EnrollmentState::AwaitingVerification { .. }
        ));
        assert!(!provisioning.qr_png.is_empty());
        assert!(provisioning.otpauth_uri.starts_with("otpauth://totp/"));

        let code = current_code(&provisioning.secret).unwrap();
        let backup_codes = flow.submit_code(&user, &code).await.unwrap();

        assert!(matches!(flow.state(), EnrollmentState::Verified { .. }));
        assert_eq!(backup_codes.len(), 10);

        let factors = provider.list_factors(&user).await.unwrap();
        assert_eq!(factors[0].status, FactorStatus::Verified);

        // The dialog closing does not touch the stored set
        assert_eq!(codes.count_remaining(&user).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_flow_awaiting() {
        let (provider, codes, user) = setup();
        let mut flow = EnrollmentFlow::new(&provider, &codes);

        let provisioning = flow.begin(&user, None).await.unwrap();

        let err = flow.submit_code(&user, "000000").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidMfaCode));
        assert!(matches!(
            flow.state(),
            EnrollmentState::AwaitingVerification { .. }
        ));

        // Retry succeeds
        let code = current_code(&provisioning.secret).unwrap();
        flow.submit_code(&user, &code).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_code_rejected_before_provider_call() {
        let (provider, codes, user) = setup();
        let mut flow = EnrollmentFlow::new(&provider, &codes);
        flow.begin(&user, None).await.unwrap();

        let err = flow.submit_code(&user, "12ab56").await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_cancel_leaves_unverified_factor_at_provider() {
        let (provider, codes, user) = setup();
        let mut flow = EnrollmentFlow::new(&provider, &codes);
        flow.begin(&user, None).await.unwrap();

        flow.cancel(&user);
        assert_eq!(*flow.state(), EnrollmentState::Cancelled);

        // Known gap, preserved: the pending factor is not unenrolled
        let factors = provider.list_factors(&user).await.unwrap();
        assert_eq!(factors.len(), 1);
        assert_eq!(factors[0].status, FactorStatus::Unverified);
    }

    #[tokio::test]
    async fn test_begin_twice_is_rejected() {
        let (provider, codes, user) = setup();
        let mut flow = EnrollmentFlow::new(&provider, &codes);
        flow.begin(&user, None).await.unwrap();

        let err = flow.begin(&user, None).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidFlowState(_)));
    }
}
