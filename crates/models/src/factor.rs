use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authentication factor registered with the identity provider.
///
/// The provider owns these records; this type mirrors the subset of the
/// provider's factor object the flows depend on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthFactor {
    pub id: Uuid,
    pub factor_type: FactorType,
    pub status: FactorStatus,
    pub friendly_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuthFactor {
    pub fn is_verified(&self) -> bool {
        self.status == FactorStatus::Verified
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorType {
    Totp,
}

/// Factor lifecycle status. A factor transitions to `Verified` only after a
/// successful challenge/verify round-trip and never transitions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorStatus {
    Unverified,
    Verified,
}

/// How strongly the provider considers a session's identity proven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssuranceLevel {
    /// Password (or equivalent single-factor) only.
    Aal1,
    /// A second factor was verified for this session.
    Aal2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factor_status_serde() {
        let json = serde_json::to_string(&FactorStatus::Unverified).unwrap();
        assert_eq!(json, "\"unverified\"");
        let status: FactorStatus = serde_json::from_str("\"verified\"").unwrap();
        assert_eq!(status, FactorStatus::Verified);
    }

    #[test]
    fn test_assurance_level_ordering() {
        assert!(AssuranceLevel::Aal2 > AssuranceLevel::Aal1);
    }
}
