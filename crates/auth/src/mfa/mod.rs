pub mod backup_codes;
pub mod manager;
pub mod store;

pub use backup_codes::{generate_codes, hash_code, normalize_code};
pub use manager::{BackupCodeManager, LOW_CODE_WARNING_THRESHOLD};
pub use store::BackupCodeStore;
