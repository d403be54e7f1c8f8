use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::provider::{Challenge, IdentityProvider, TotpProvisioning};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tavola_models::{AssuranceLevel, AuthFactor};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct HostedProviderConfig {
    /// Base URL of the provider's auth API, e.g. `https://auth.example.com`.
    pub base_url: String,
    /// Service-role key sent as a bearer token.
    pub service_key: String,
}

impl HostedProviderConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("AUTH_PROVIDER_URL")
                .unwrap_or_else(|_| "http://localhost:9999".to_string()),
            service_key: std::env::var("AUTH_PROVIDER_SERVICE_KEY").unwrap_or_default(),
        }
    }
}

/// Factor-management client for a hosted GoTrue-style identity provider.
///
/// All calls go through the admin surface with the service-role key; the
/// exact wire shapes are the provider's, only the semantic contract of
/// [`IdentityProvider`] is relied on here.
pub struct HostedProvider {
    config: HostedProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct FactorResponse {
    id: Uuid,
    factor_type: String,
    status: String,
    friendly_name: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct EnrollResponse {
    id: Uuid,
    totp: EnrollTotpBody,
}

#[derive(Debug, Deserialize)]
struct EnrollTotpBody {
    secret: String,
    uri: String,
    /// Base64 PNG of the QR code.
    qr_code: String,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AalResponse {
    current_level: String,
}

impl HostedProvider {
    pub fn new(config: HostedProviderConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn parse_factor(&self, raw: FactorResponse) -> Result<AuthFactor> {
        let factor_type = match raw.factor_type.as_str() {
            "totp" => tavola_models::FactorType::Totp,
            other => {
                return Err(AuthError::ExternalProviderError(format!(
                    "Unknown factor type: {}",
                    other
                )))
            }
        };
        let status = match raw.status.as_str() {
            "verified" => tavola_models::FactorStatus::Verified,
            "unverified" => tavola_models::FactorStatus::Unverified,
            other => {
                return Err(AuthError::ExternalProviderError(format!(
                    "Unknown factor status: {}",
                    other
                )))
            }
        };

        Ok(AuthFactor {
            id: raw.id,
            factor_type,
            status,
            friendly_name: raw.friendly_name,
            created_at: raw.created_at,
        })
    }

    /// Check a response from a factor-management endpoint. A 401/403 here
    /// means the service call itself was refused (bad service key, revoked
    /// access), not that the user submitted a wrong code.
    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        self.check_with(response, false).await
    }

    /// Check a response from a code-checking endpoint (challenge create and
    /// verify), where a 401/403/422 is the provider rejecting the code.
    async fn check_code(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        self.check_with(response, true).await
    }

    async fn check_with(
        &self,
        response: reqwest::Response,
        checks_code: bool,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let err = classify_failure(status, checks_code);
        if matches!(err, AuthError::ExternalProviderError(_)) {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, "identity provider call failed: {}", body);
        }
        Err(err)
    }
}

fn classify_failure(status: StatusCode, checks_code: bool) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY
            if checks_code =>
        {
            AuthError::InvalidMfaCode
        }
        StatusCode::NOT_FOUND => AuthError::FactorNotFound,
        status => AuthError::ExternalProviderError(format!("Provider returned {}", status)),
    }
}

#[async_trait]
impl IdentityProvider for HostedProvider {
    async fn list_factors(&self, user: &UserContext) -> Result<Vec<AuthFactor>> {
        let response = self
            .client
            .get(self.url(&format!("/admin/users/{}/factors", user.user_id)))
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        let raw: Vec<FactorResponse> = self.check(response).await?.json().await?;
        raw.into_iter().map(|f| self.parse_factor(f)).collect()
    }

    async fn enroll_totp(
        &self,
        user: &UserContext,
        friendly_name: Option<&str>,
    ) -> Result<TotpProvisioning> {
        let response = self
            .client
            .post(self.url(&format!("/admin/users/{}/factors", user.user_id)))
            .bearer_auth(&self.config.service_key)
            .json(&json!({
                "factor_type": "totp",
                "friendly_name": friendly_name,
                "issuer": "Tavola",
                "account_name": user.email,
            }))
            .send()
            .await?;

        let body: EnrollResponse = self.check(response).await?.json().await?;
        let qr_png = base64_decode(&body.totp.qr_code)?;

        Ok(TotpProvisioning {
            factor_id: body.id,
            secret: body.totp.secret,
            otpauth_uri: body.totp.uri,
            qr_png,
        })
    }

    async fn create_challenge(&self, user: &UserContext, factor_id: Uuid) -> Result<Challenge> {
        let response = self
            .client
            .post(self.url(&format!(
                "/admin/users/{}/factors/{}/challenge",
                user.user_id, factor_id
            )))
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        let body: ChallengeResponse = self.check_code(response).await?.json().await?;

        Ok(Challenge {
            id: body.id,
            factor_id,
            expires_at: body.expires_at,
        })
    }

    async fn verify_challenge(
        &self,
        user: &UserContext,
        factor_id: Uuid,
        challenge_id: Uuid,
        code: &str,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!(
                "/admin/users/{}/factors/{}/verify",
                user.user_id, factor_id
            )))
            .bearer_auth(&self.config.service_key)
            .json(&json!({
                "challenge_id": challenge_id,
                "code": code,
            }))
            .send()
            .await?;

        self.check_code(response).await?;
        Ok(())
    }

    async fn unenroll_factor(&self, user: &UserContext, factor_id: Uuid) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!(
                "/admin/users/{}/factors/{}",
                user.user_id, factor_id
            )))
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }

    async fn assurance_level(&self, user: &UserContext) -> Result<AssuranceLevel> {
        let response = self
            .client
            .get(self.url(&format!("/admin/users/{}/aal", user.user_id)))
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        let body: AalResponse = self.check(response).await?.json().await?;
        match body.current_level.as_str() {
            "aal2" => Ok(AssuranceLevel::Aal2),
            "aal1" => Ok(AssuranceLevel::Aal1),
            other => Err(AuthError::ExternalProviderError(format!(
                "Unknown assurance level: {}",
                other
            ))),
        }
    }

    async fn sign_out(&self, user: &UserContext) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/admin/users/{}/logout", user.user_id)))
            .bearer_auth(&self.config.service_key)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }
}

fn base64_decode(data: &str) -> Result<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(data.trim_start_matches("data:image/png;base64,"))
        .map_err(|e| AuthError::ExternalProviderError(format!("Bad QR payload: {}", e)))
}
