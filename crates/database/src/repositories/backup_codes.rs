use crate::error::Result;
use sqlx::PgPool;
use tavola_models::BackupCode;
use uuid::Uuid;

/// Storage for hashed single-use recovery codes.
///
/// The table only ever holds hashes; plaintext codes never reach this layer.
pub struct BackupCodeRepository {
    pool: PgPool,
}

impl BackupCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the user's code set: delete every existing row, then insert
    /// the new batch, all in one transaction. A failure anywhere rolls the
    /// whole thing back so the user is never left with a partial set.
    pub async fn replace_for_user(&self, user_id: Uuid, code_hashes: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM mfa_backup_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO mfa_backup_codes (user_id, code_hash)
            SELECT $1, unnest($2::text[])
            "#,
        )
        .bind(user_id)
        .bind(code_hashes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Atomically consume an unused code matching `code_hash` for this user.
    ///
    /// The conditional UPDATE is the concurrency guard: two concurrent
    /// redemptions of the same code race on `used = false` and exactly one
    /// wins. Returns the consumed row, or `None` when no unused code matched.
    pub async fn redeem(&self, user_id: Uuid, code_hash: &str) -> Result<Option<BackupCode>> {
        let row = sqlx::query_as::<_, BackupCode>(
            r#"
            UPDATE mfa_backup_codes
            SET used = true, used_at = NOW()
            WHERE user_id = $1 AND code_hash = $2 AND used = false
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(code_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Number of unused codes the user has left.
    pub async fn count_unused(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM mfa_backup_codes
            WHERE user_id = $1 AND used = false
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Delete every code row for the user. Idempotent, safe to retry after
    /// a partially failed disable.
    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM mfa_backup_codes WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{Database, DatabaseConfig};

    #[tokio::test]
    #[ignore] // Only run with database available
    async fn test_replace_redeem_cycle() {
        let db = Database::new(DatabaseConfig::from_env())
            .await
            .expect("Failed to connect to database");
        let repo = BackupCodeRepository::new(db.pool().clone());
        let user_id = Uuid::new_v4();

        let hashes: Vec<String> = (0..10).map(|i| format!("hash-{i}")).collect();
        repo.replace_for_user(user_id, &hashes).await.unwrap();
        assert_eq!(repo.count_unused(user_id).await.unwrap(), 10);

        let consumed = repo
            .redeem(user_id, "hash-0")
            .await
            .unwrap()
            .expect("first redemption should consume the row");
        assert_eq!(consumed.user_id, user_id);
        assert_eq!(consumed.code_hash, "hash-0");
        assert!(consumed.used);
        assert!(consumed.used_at.is_some());

        assert!(repo.redeem(user_id, "hash-0").await.unwrap().is_none());
        assert_eq!(repo.count_unused(user_id).await.unwrap(), 9);

        assert_eq!(repo.delete_for_user(user_id).await.unwrap(), 10);
    }
}
