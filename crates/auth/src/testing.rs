//! In-memory store used by the flow and manager tests.

use crate::error::Result;
use crate::mfa::store::BackupCodeStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredCode {
    code_hash: String,
    used: bool,
    used_at: Option<DateTime<Utc>>,
}

/// `BackupCodeStore` backed by a mutex-guarded map. The single lock gives
/// the same atomic check-and-mark the SQL conditional UPDATE does.
pub struct InMemoryBackupCodeStore {
    codes: Mutex<HashMap<Uuid, Vec<StoredCode>>>,
}

impl InMemoryBackupCodeStore {
    pub fn new() -> Self {
        Self {
            codes: Mutex::new(HashMap::new()),
        }
    }

    /// Timestamp a stored code was consumed at, if it has been.
    pub fn used_at(&self, user_id: Uuid, code_hash: &str) -> Option<DateTime<Utc>> {
        self.codes
            .lock()
            .unwrap()
            .get(&user_id)
            .and_then(|rows| rows.iter().find(|r| r.code_hash == code_hash))
            .and_then(|r| r.used_at)
    }
}

#[async_trait]
impl BackupCodeStore for InMemoryBackupCodeStore {
    async fn replace_codes(&self, user_id: Uuid, code_hashes: &[String]) -> Result<()> {
        let rows = code_hashes
            .iter()
            .map(|hash| StoredCode {
                code_hash: hash.clone(),
                used: false,
                used_at: None,
            })
            .collect();
        self.codes.lock().unwrap().insert(user_id, rows);
        Ok(())
    }

    async fn redeem_hash(&self, user_id: Uuid, code_hash: &str) -> Result<bool> {
        let mut codes = self.codes.lock().unwrap();
        let Some(rows) = codes.get_mut(&user_id) else {
            return Ok(false);
        };

        match rows
            .iter_mut()
            .find(|r| r.code_hash == code_hash && !r.used)
        {
            Some(row) => {
                row.used = true;
                row.used_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_unused(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|rows| rows.iter().filter(|r| !r.used).count() as i64)
            .unwrap_or(0))
    }

    async fn delete_all(&self, user_id: Uuid) -> Result<u64> {
        Ok(self
            .codes
            .lock()
            .unwrap()
            .remove(&user_id)
            .map(|rows| rows.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfa::backup_codes::hash_code;

    #[tokio::test]
    async fn test_second_redeem_leaves_used_at_untouched() {
        let store = InMemoryBackupCodeStore::new();
        let user_id = Uuid::new_v4();
        let hash = hash_code("AB3D-9F2K");

        store.replace_codes(user_id, &[hash.clone()]).await.unwrap();

        assert!(store.redeem_hash(user_id, &hash).await.unwrap());
        let first = store.used_at(user_id, &hash).unwrap();

        assert!(!store.redeem_hash(user_id, &hash).await.unwrap());
        assert_eq!(store.used_at(user_id, &hash), Some(first));
    }
}
