pub mod backup_codes;
pub mod sessions;
