use thiserror::Error;

pub type Result<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid MFA code")]
    InvalidMfaCode,

    #[error("Invalid or already used backup code")]
    InvalidBackupCode,

    #[error("No verified TOTP factor enrolled")]
    NotEnrolled,

    #[error("Factor not found")]
    FactorNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Flow state error: {0}")]
    InvalidFlowState(String),

    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] tavola_database::DatabaseError),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::ExternalProviderError(err.to_string())
    }
}
