use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::mfa::backup_codes::{
    generate_codes, hash_code, normalize_code, CODE_LENGTH, DEFAULT_CODE_COUNT,
};
use crate::mfa::store::BackupCodeStore;
use std::sync::Arc;

/// At or below this many unused codes, callers should surface a
/// "running low, regenerate soon" warning.
pub const LOW_CODE_WARNING_THRESHOLD: i64 = 3;

/// Produces, stores and redeems single-use recovery codes.
///
/// Plaintext codes exist only in the return value of [`generate`]; the store
/// only ever sees hashes. Regenerating invalidates every previously issued
/// code for the user, used or not.
///
/// [`generate`]: BackupCodeManager::generate
#[derive(Clone)]
pub struct BackupCodeManager {
    store: Arc<dyn BackupCodeStore>,
}

impl BackupCodeManager {
    pub fn new(store: Arc<dyn BackupCodeStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh batch of `DEFAULT_CODE_COUNT` codes for the user,
    /// replacing any existing set. Returns the plaintext codes, the one
    /// and only time they are available.
    pub async fn generate(&self, user: &UserContext) -> Result<Vec<String>> {
        self.generate_count(user, DEFAULT_CODE_COUNT).await
    }

    pub async fn generate_count(&self, user: &UserContext, count: usize) -> Result<Vec<String>> {
        let codes = generate_codes(count);
        let hashes: Vec<String> = codes.iter().map(|c| hash_code(c)).collect();

        self.store.replace_codes(user.user_id, &hashes).await?;

        tracing::info!(user_id = %user.user_id, count, "regenerated backup codes");
        Ok(codes)
    }

    /// Redeem a submitted code as proof of identity. Consumes the matching
    /// row; a code redeems at most once. Malformed input is rejected before
    /// the store is touched.
    pub async fn redeem(&self, user: &UserContext, submitted: &str) -> Result<()> {
        let normalized = normalize_code(submitted);
        if normalized.len() < CODE_LENGTH {
            return Err(AuthError::ValidationError(
                "Backup code must be at least 8 characters".to_string(),
            ));
        }

        let consumed = self
            .store
            .redeem_hash(user.user_id, &hash_code(&normalized))
            .await?;

        if !consumed {
            // Wrong code, already used, or no codes exist. Same answer for
            // all three.
            return Err(AuthError::InvalidBackupCode);
        }

        tracing::info!(user_id = %user.user_id, "backup code redeemed");
        Ok(())
    }

    /// Unused codes the user has left.
    pub async fn count_remaining(&self, user: &UserContext) -> Result<i64> {
        self.store.count_unused(user.user_id).await
    }

    /// Whether the user should be nudged to regenerate.
    pub async fn running_low(&self, user: &UserContext) -> Result<bool> {
        Ok(self.count_remaining(user).await? <= LOW_CODE_WARNING_THRESHOLD)
    }

    /// Remove every code for the user (MFA disable cleanup). Idempotent.
    pub async fn delete_all(&self, user: &UserContext) -> Result<u64> {
        self.store.delete_all(user.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryBackupCodeStore;
    use uuid::Uuid;

    fn manager() -> BackupCodeManager {
        BackupCodeManager::new(Arc::new(InMemoryBackupCodeStore::new()))
    }

    fn user() -> UserContext {
        UserContext::new(Uuid::new_v4(), "guest@tavola.example")
    }

    #[tokio::test]
    async fn test_regenerating_invalidates_previous_batch() {
        let manager = manager();
        let user = user();

        let first = manager.generate(&user).await.unwrap();
        let second = manager.generate(&user).await.unwrap();
        assert_eq!(second.len(), 10);

        // Every first-batch code is dead, even though none were used
        for code in &first {
            let err = manager.redeem(&user, code).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidBackupCode));
        }

        // Second batch still fully redeemable
        manager.redeem(&user, &second[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_code_redeems_exactly_once() {
        let manager = manager();
        let user = user();

        let codes = manager.generate(&user).await.unwrap();
        manager.redeem(&user, &codes[0]).await.unwrap();

        let err = manager.redeem(&user, &codes[0]).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidBackupCode));
    }

    #[tokio::test]
    async fn test_redeem_is_scoped_by_user() {
        let store = Arc::new(InMemoryBackupCodeStore::new());
        let manager = BackupCodeManager::new(store);
        let alice = user();
        let mallory = user();

        let codes = manager.generate(&alice).await.unwrap();

        let err = manager.redeem(&mallory, &codes[0]).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidBackupCode));

        // Alice is unaffected
        manager.redeem(&alice, &codes[0]).await.unwrap();
    }

    #[tokio::test]
    async fn test_count_remaining_tracks_redemptions() {
        let manager = manager();
        let user = user();

        let codes = manager.generate(&user).await.unwrap();
        assert_eq!(manager.count_remaining(&user).await.unwrap(), 10);

        for code in codes.iter().take(3) {
            manager.redeem(&user, code).await.unwrap();
        }
        assert_eq!(manager.count_remaining(&user).await.unwrap(), 7);
        assert!(!manager.running_low(&user).await.unwrap());

        for code in codes.iter().skip(3).take(4) {
            manager.redeem(&user, code).await.unwrap();
        }
        assert!(manager.running_low(&user).await.unwrap());
    }

    #[tokio::test]
    async fn test_redeem_accepts_any_input_form() {
        let manager = manager();
        let user = user();

        let codes = manager.generate(&user).await.unwrap();
        let lowered = codes[0].to_lowercase();
        let stripped = lowered.replace('-', "");

        manager.redeem(&user, &stripped).await.unwrap();

        // The variants all named the same stored code, so it is now spent
        let err = manager.redeem(&user, &codes[0]).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidBackupCode));
    }

    #[tokio::test]
    async fn test_short_input_rejected_before_lookup() {
        let manager = manager();
        let user = user();
        manager.generate(&user).await.unwrap();

        let err = manager.redeem(&user, "AB3-D9").await.unwrap_err();
        assert!(matches!(err, AuthError::ValidationError(_)));
        assert_eq!(manager.count_remaining(&user).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_delete_all_is_idempotent() {
        let manager = manager();
        let user = user();
        manager.generate(&user).await.unwrap();

        assert_eq!(manager.delete_all(&user).await.unwrap(), 10);
        assert_eq!(manager.delete_all(&user).await.unwrap(), 0);
        assert_eq!(manager.count_remaining(&user).await.unwrap(), 0);
    }
}
