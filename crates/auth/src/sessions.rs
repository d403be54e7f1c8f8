use crate::context::UserContext;
use crate::error::Result;
use sha2::{Digest, Sha256};
use tavola_database::SessionRecordRepository;
use tavola_models::{DeviceInfo, NewSessionRecord, SessionRecord};
use uuid::Uuid;

/// Length of the stored token-hash prefix. Enough to correlate a row with a
/// live token, useless for reconstructing it.
const TOKEN_FRAGMENT_LEN: usize = 12;

/// Hex prefix of the SHA-256 of a session token.
pub fn token_fragment(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)[..TOKEN_FRAGMENT_LEN].to_string()
}

/// Maintains the informational session audit trail.
///
/// Nothing here gates authentication: revoking a record does not invalidate
/// the provider session, it only updates the dashboard's view.
pub struct SessionTracker {
    repo: SessionRecordRepository,
}

impl SessionTracker {
    pub fn new(repo: SessionRecordRepository) -> Self {
        Self { repo }
    }

    /// Record a fresh sign-in as the user's current session.
    pub async fn record_sign_in(
        &self,
        user: &UserContext,
        session_token: &str,
        user_agent: &str,
    ) -> Result<SessionRecord> {
        let info = DeviceInfo::from_user_agent(user_agent);
        let new_session = NewSessionRecord {
            user_id: user.user_id,
            token_fragment: token_fragment(session_token),
            device: info.device,
            browser: info.browser,
            os: info.os,
        };

        let session = self.repo.record(&new_session).await?;
        tracing::debug!(user_id = %user.user_id, session_id = %session.id, "session recorded");
        Ok(session)
    }

    pub async fn list(&self, user: &UserContext) -> Result<Vec<SessionRecord>> {
        Ok(self.repo.list_for_user(user.user_id).await?)
    }

    /// Bump last-activity for the session matching this token.
    pub async fn touch(&self, user: &UserContext, session_token: &str) -> Result<()> {
        Ok(self
            .repo
            .touch(user.user_id, &token_fragment(session_token))
            .await?)
    }

    /// Mark a session record revoked (bookkeeping only).
    pub async fn revoke(&self, user: &UserContext, session_id: Uuid) -> Result<SessionRecord> {
        let session = self.repo.revoke(user.user_id, session_id).await?;
        tracing::info!(user_id = %user.user_id, %session_id, "session record revoked");
        Ok(session)
    }
}
