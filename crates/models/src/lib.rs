pub mod backup_code;
pub mod factor;
pub mod session;

// Re-export commonly used types
pub use backup_code::BackupCode;
pub use factor::{AssuranceLevel, AuthFactor, FactorStatus, FactorType};
pub use session::{DeviceInfo, NewSessionRecord, SessionRecord};
