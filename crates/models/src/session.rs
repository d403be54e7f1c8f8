use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Informational record of an authenticated browser session.
///
/// This is a secondary audit trail: revoking a row does not invalidate the
/// underlying provider session, it is bookkeeping for the dashboard's
/// "active sessions" screen.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Prefix of the hashed session token, enough to correlate, never the
    /// token itself.
    pub token_fragment: String,
    pub device: String,
    pub browser: String,
    pub os: String,
    pub is_current: bool,
    pub revoked: bool,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_active_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSessionRecord {
    pub user_id: Uuid,
    pub token_fragment: String,
    pub device: String,
    pub browser: String,
    pub os: String,
}

/// Coarse device/browser/OS classification parsed from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device: String,
    pub browser: String,
    pub os: String,
}

impl DeviceInfo {
    /// Classify a user-agent string. Substring matching only; anything
    /// unrecognized falls back to "Unknown".
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();

        let os = if ua.contains("windows") {
            "Windows"
        } else if ua.contains("iphone") || ua.contains("ipad") {
            "iOS"
        } else if ua.contains("mac os") || ua.contains("macintosh") {
            "macOS"
        } else if ua.contains("android") {
            "Android"
        } else if ua.contains("linux") {
            "Linux"
        } else {
            "Unknown"
        };

        // Order matters: Chrome UAs contain "safari", Edge UAs contain
        // "chrome".
        let browser = if ua.contains("edg/") || ua.contains("edge") {
            "Edge"
        } else if ua.contains("opr/") || ua.contains("opera") {
            "Opera"
        } else if ua.contains("firefox") {
            "Firefox"
        } else if ua.contains("chrome") || ua.contains("crios") {
            "Chrome"
        } else if ua.contains("safari") {
            "Safari"
        } else {
            "Unknown"
        };

        let device = if ua.contains("ipad") || ua.contains("tablet") {
            "Tablet"
        } else if ua.contains("mobile") || ua.contains("iphone") || ua.contains("android") {
            "Mobile"
        } else {
            "Desktop"
        };

        Self {
            device: device.to_string(),
            browser: browser.to_string(),
            os: os.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_desktop_chrome() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
        let info = DeviceInfo::from_user_agent(ua);
        assert_eq!(info.device, "Desktop");
        assert_eq!(info.browser, "Chrome");
        assert_eq!(info.os, "Windows");
    }

    #[test]
    fn test_classify_iphone_safari() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) \
                  AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
        let info = DeviceInfo::from_user_agent(ua);
        assert_eq!(info.device, "Mobile");
        assert_eq!(info.browser, "Safari");
        assert_eq!(info.os, "iOS");
    }

    #[test]
    fn test_classify_edge_not_chrome() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                  (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
        let info = DeviceInfo::from_user_agent(ua);
        assert_eq!(info.browser, "Edge");
    }

    #[test]
    fn test_classify_unknown() {
        let info = DeviceInfo::from_user_agent("curl/8.4.0");
        assert_eq!(info.browser, "Unknown");
        assert_eq!(info.os, "Unknown");
        assert_eq!(info.device, "Desktop");
    }
}
