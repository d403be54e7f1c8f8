use crate::error::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims of a provider-issued session token. Validated by the API's bearer
/// middleware; this service does not mint production tokens, the provider
/// does.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    /// Provider assurance level ("aal1" / "aal2").
    pub aal: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm: Algorithm::HS256,
        }
    }

    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        Self::new(&secret)
    }

    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::new(self.algorithm))?;
        Ok(data.claims)
    }

    /// Mint a short-lived token with the provider's claim shape. Local
    /// provider mode and tests only.
    pub fn issue_access_token(&self, user_id: Uuid, email: &str, aal: Option<&str>) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            aal: aal.map(str::to_string),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };
        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_validate_round_trip() {
        let service = JwtService::new("test-secret");
        let user_id = Uuid::new_v4();

        let token = service
            .issue_access_token(user_id, "guest@tavola.example", Some("aal2"))
            .unwrap();
        let claims = service.validate_access_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "guest@tavola.example");
        assert_eq!(claims.aal.as_deref(), Some("aal2"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = JwtService::new("test-secret");
        let other = JwtService::new("other-secret");

        let token = service
            .issue_access_token(Uuid::new_v4(), "guest@tavola.example", None)
            .unwrap();
        assert!(other.validate_access_token(&token).is_err());
    }
}
