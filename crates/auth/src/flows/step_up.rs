use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::flows::validate_totp_input;
use crate::mfa::manager::BackupCodeManager;
use crate::provider::{find_verified_factor, IdentityProvider};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepUpMethod {
    Totp,
    BackupCode,
}

/// How a step-up was satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpOutcome {
    pub method: StepUpMethod,
    /// Whether the provider's assurance level was actually raised. The
    /// backup-code path proves identity out-of-band without re-challenging
    /// the provider, so it leaves this false. Original behavior, kept
    /// rather than fixed. Callers deciding on provider-side trust must look
    /// at this, not just at success.
    pub assurance_elevated: bool,
    /// The user should be told to regenerate their codes.
    pub regenerate_notice: bool,
    /// ≤3 unused codes remain.
    pub low_on_codes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepUpState {
    AwaitingCode,
    Satisfied(StepUpOutcome),
    Aborted,
}

/// Sign-in step-up: a session authenticated at base assurance must present
/// a second factor before reaching the protected area.
pub struct StepUpFlow<'a> {
    provider: &'a dyn IdentityProvider,
    codes: &'a BackupCodeManager,
    state: StepUpState,
}

impl<'a> StepUpFlow<'a> {
    pub fn new(provider: &'a dyn IdentityProvider, codes: &'a BackupCodeManager) -> Self {
        Self {
            provider,
            codes,
            state: StepUpState::AwaitingCode,
        }
    }

    pub fn state(&self) -> &StepUpState {
        &self.state
    }

    fn ensure_awaiting(&self) -> Result<()> {
        if self.state == StepUpState::AwaitingCode {
            Ok(())
        } else {
            Err(AuthError::InvalidFlowState(
                "Step-up is not awaiting a code".to_string(),
            ))
        }
    }

    /// Primary path: challenge and verify the user's verified TOTP factor.
    /// Success elevates the provider session to AAL2. A wrong code leaves
    /// the flow awaiting so the user can retry.
    pub async fn submit_totp(&mut self, user: &UserContext, code: &str) -> Result<StepUpOutcome> {
        self.ensure_awaiting()?;
        validate_totp_input(code)?;

        let factor = find_verified_factor(self.provider, user)
            .await?
            .ok_or(AuthError::NotEnrolled)?;

        let challenge = self.provider.create_challenge(user, factor.id).await?;
        self.provider
            .verify_challenge(user, factor.id, challenge.id, code)
            .await?;

        let outcome = StepUpOutcome {
            method: StepUpMethod::Totp,
            assurance_elevated: true,
            regenerate_notice: false,
            low_on_codes: self.codes.running_low(user).await?,
        };
        self.state = StepUpState::Satisfied(outcome.clone());
        tracing::info!(user_id = %user.user_id, "step-up satisfied via TOTP");
        Ok(outcome)
    }

    /// Alternate path: redeem a single-use backup code. Proves identity for
    /// this step-up but does not touch the provider's assurance level; the
    /// outcome tells the caller to recommend regenerating codes.
    pub async fn submit_backup_code(
        &mut self,
        user: &UserContext,
        code: &str,
    ) -> Result<StepUpOutcome> {
        self.ensure_awaiting()?;

        self.codes.redeem(user, code).await?;

        let outcome = StepUpOutcome {
            method: StepUpMethod::BackupCode,
            assurance_elevated: false,
            regenerate_notice: true,
            low_on_codes: self.codes.running_low(user).await?,
        };
        self.state = StepUpState::Satisfied(outcome.clone());
        tracing::info!(user_id = %user.user_id, "step-up satisfied via backup code");
        Ok(outcome)
    }

    /// Abort the pending sign-in and sign the partially-authenticated
    /// session out entirely. No half-authenticated state survives.
    pub async fn cancel(&mut self, user: &UserContext) -> Result<()> {
        self.provider.sign_out(user).await?;
        self.state = StepUpState::Aborted;
        tracing::info!(user_id = %user.user_id, "step-up cancelled, session signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::local::{current_code, LocalProvider};
    use crate::provider::IdentityProvider;
    use crate::testing::InMemoryBackupCodeStore;
    use std::sync::Arc;
    use tavola_models::AssuranceLevel;
    use uuid::Uuid;

    /// Enroll and verify a factor directly against the provider, returning
    /// the shared secret.
    async fn enroll_verified_factor(provider: &LocalProvider, user: &UserContext) -> String {
        let provisioning = provider.enroll_totp(user, None).await.unwrap();
        let challenge = provider
            .create_challenge(user, provisioning.factor_id)
            .await
            .unwrap();
        let code = current_code(&provisioning.secret).unwrap();
        provider
            .verify_challenge(user, provisioning.factor_id, challenge.id, &code)
            .await
            .unwrap();
        provisioning.secret
    }

    fn setup() -> (LocalProvider, BackupCodeManager, UserContext) {
        let provider = LocalProvider::new("Tavola");
        let codes = BackupCodeManager::new(Arc::new(InMemoryBackupCodeStore::new()));
        let user = UserContext::new(Uuid::new_v4(), "guest@tavola.example");
        (provider, codes, user)
    }

    #[tokio::test]
    async fn test_totp_path_elevates_assurance() {
        let (provider, codes, user) = setup();
        let secret = enroll_verified_factor(&provider, &user).await;
        codes.generate(&user).await.unwrap();

        let mut flow = StepUpFlow::new(&provider, &codes);
        let outcome = flow
            .submit_totp(&user, &current_code(&secret).unwrap())
            .await
            .unwrap();

        assert_eq!(outcome.method, StepUpMethod::Totp);
        assert!(outcome.assurance_elevated);
        assert!(!outcome.regenerate_notice);
        assert_eq!(
            provider.assurance_level(&user).await.unwrap(),
            AssuranceLevel::Aal2
        );
    }

    #[tokio::test]
    async fn test_backup_code_path_consumes_code_without_elevating() {
        let (provider, codes, user) = setup();
        enroll_verified_factor(&provider, &user).await;
        let backup_codes = codes.generate(&user).await.unwrap();

        // Fresh provider session at base assurance
        provider.sign_out(&user).await.unwrap();

        let mut flow = StepUpFlow::new(&provider, &codes);
        let outcome = flow
            .submit_backup_code(&user, &backup_codes[0])
            .await
            .unwrap();

        assert_eq!(outcome.method, StepUpMethod::BackupCode);
        assert!(!outcome.assurance_elevated);
        assert!(outcome.regenerate_notice);
        assert_eq!(codes.count_remaining(&user).await.unwrap(), 9);

        // Provider trust was not re-established
        assert_eq!(
            provider.assurance_level(&user).await.unwrap(),
            AssuranceLevel::Aal1
        );
    }

    #[tokio::test]
    async fn test_used_backup_code_fails_second_step_up() {
        let (provider, codes, user) = setup();
        enroll_verified_factor(&provider, &user).await;
        let backup_codes = codes.generate(&user).await.unwrap();

        let mut flow = StepUpFlow::new(&provider, &codes);
        flow.submit_backup_code(&user, &backup_codes[0])
            .await
            .unwrap();

        let mut second = StepUpFlow::new(&provider, &codes);
        let err = second
            .submit_backup_code(&user, &backup_codes[0])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidBackupCode));
        assert_eq!(*second.state(), StepUpState::AwaitingCode);
    }

    #[tokio::test]
    async fn test_totp_without_verified_factor_is_not_enrolled() {
        let (provider, codes, user) = setup();

        let mut flow = StepUpFlow::new(&provider, &codes);
        let err = flow.submit_totp(&user, "123456").await.unwrap_err();
        assert!(matches!(err, AuthError::NotEnrolled));
    }

    #[tokio::test]
    async fn test_cancel_signs_session_out() {
        let (provider, codes, user) = setup();
        enroll_verified_factor(&provider, &user).await;

        let mut flow = StepUpFlow::new(&provider, &codes);
        flow.cancel(&user).await.unwrap();

        assert_eq!(*flow.state(), StepUpState::Aborted);
        assert!(provider.is_signed_out(user.user_id));

        let err = flow.submit_totp(&user, "123456").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidFlowState(_)));
    }
}
