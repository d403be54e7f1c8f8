use crate::error::{DatabaseError, Result};
use sqlx::PgPool;
use tavola_models::{NewSessionRecord, SessionRecord};
use uuid::Uuid;

/// Informational audit trail of browser sessions.
///
/// Rows here do not gate authentication; revoking one is bookkeeping only
/// and does not touch the provider session.
pub struct SessionRecordRepository {
    pool: PgPool,
}

impl SessionRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a new session row and make it the user's current one. The
    /// clear-then-set runs in a transaction so at most one row per user is
    /// ever marked current.
    pub async fn record(&self, new_session: &NewSessionRecord) -> Result<SessionRecord> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE user_sessions SET is_current = false WHERE user_id = $1")
            .bind(new_session.user_id)
            .execute(&mut *tx)
            .await?;

        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO user_sessions (
                user_id, token_fragment, device, browser, os, is_current
            )
            VALUES ($1, $2, $3, $4, $5, true)
            RETURNING *
            "#,
        )
        .bind(new_session.user_id)
        .bind(&new_session.token_fragment)
        .bind(&new_session.device)
        .bind(&new_session.browser)
        .bind(&new_session.os)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(session)
    }

    /// All session rows for a user, current first, newest first after that.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<SessionRecord>> {
        let sessions = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT * FROM user_sessions
            WHERE user_id = $1
            ORDER BY is_current DESC, last_active_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Bump the last-active timestamp for the row matching a token fragment.
    pub async fn touch(&self, user_id: Uuid, token_fragment: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE user_sessions
            SET last_active_at = NOW()
            WHERE user_id = $1 AND token_fragment = $2 AND revoked = false
            "#,
        )
        .bind(user_id)
        .bind(token_fragment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark a session row revoked. Fails with NotFound if the row does not
    /// belong to the user or is already revoked.
    pub async fn revoke(&self, user_id: Uuid, session_id: Uuid) -> Result<SessionRecord> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            UPDATE user_sessions
            SET revoked = true, revoked_at = NOW(), is_current = false
            WHERE id = $1 AND user_id = $2 AND revoked = false
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::NotFound("Session not found or already revoked".to_string()))?;

        Ok(session)
    }

    /// Delete all rows for a user.
    pub async fn delete_all_for_user(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
