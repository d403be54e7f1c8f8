pub mod disable;
pub mod enroll;
pub mod step_up;

use crate::error::{AuthError, Result};

/// Reject anything that is not exactly six ASCII digits before any network
/// call is made.
pub(crate) fn validate_totp_input(code: &str) -> Result<()> {
    if code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(AuthError::ValidationError(
            "Code must be exactly 6 digits".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_totp_input() {
        assert!(validate_totp_input("123456").is_ok());
        assert!(validate_totp_input("12345").is_err());
        assert!(validate_totp_input("1234567").is_err());
        assert!(validate_totp_input("12345a").is_err());
        assert!(validate_totp_input("").is_err());
    }
}
