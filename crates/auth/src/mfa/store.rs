use crate::error::Result;
use async_trait::async_trait;
use tavola_database::BackupCodeRepository;
use uuid::Uuid;

/// Persistence seam for hashed backup codes.
///
/// The Postgres implementation lives in `tavola-database`; tests use an
/// in-memory store. Implementations must make `redeem_hash` a single atomic
/// check-and-mark so two concurrent redemptions of one code cannot both
/// succeed.
#[async_trait]
pub trait BackupCodeStore: Send + Sync {
    /// Drop all existing rows for the user and insert the new batch.
    /// All-or-nothing: a failure must leave no partial set behind.
    async fn replace_codes(&self, user_id: Uuid, code_hashes: &[String]) -> Result<()>;

    /// Consume one unused row matching the hash, returning whether a row
    /// was consumed.
    async fn redeem_hash(&self, user_id: Uuid, code_hash: &str) -> Result<bool>;

    /// Unused rows left for the user.
    async fn count_unused(&self, user_id: Uuid) -> Result<i64>;

    /// Remove all rows for the user. Must be idempotent.
    async fn delete_all(&self, user_id: Uuid) -> Result<u64>;
}

#[async_trait]
impl BackupCodeStore for BackupCodeRepository {
    async fn replace_codes(&self, user_id: Uuid, code_hashes: &[String]) -> Result<()> {
        self.replace_for_user(user_id, code_hashes).await?;
        Ok(())
    }

    async fn redeem_hash(&self, user_id: Uuid, code_hash: &str) -> Result<bool> {
        Ok(self.redeem(user_id, code_hash).await?.is_some())
    }

    async fn count_unused(&self, user_id: Uuid) -> Result<i64> {
        Ok(BackupCodeRepository::count_unused(self, user_id).await?)
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64> {
        Ok(self.delete_for_user(user_id).await?)
    }
}
