use crate::context::UserContext;
use crate::error::{AuthError, Result};
use crate::provider::{Challenge, IdentityProvider, TotpProvisioning};
use async_trait::async_trait;
use base32::Alphabet;
use chrono::{Duration, Utc};
use image::Luma;
use qrcode::QrCode;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tavola_models::{AssuranceLevel, AuthFactor, FactorStatus, FactorType};
use totp_lite::{totp_custom, Sha1};
use uuid::Uuid;

const TOTP_DIGITS: u32 = 6;
const TOTP_STEP: u64 = 30; // 30 seconds
const CHALLENGE_TTL_SECS: i64 = 300;

struct FactorRecord {
    factor: AuthFactor,
    secret: String,
}

struct ChallengeRecord {
    user_id: Uuid,
    factor_id: Uuid,
    expires_at: chrono::DateTime<Utc>,
}

/// Self-contained in-process identity provider.
///
/// Implements the whole factor contract locally: secret generation, TOTP
/// verification with a ±1 step window, challenges with a short TTL, and
/// per-user assurance tracking. Used in development and tests; production
/// deployments point at [`HostedProvider`](crate::provider::hosted::HostedProvider).
pub struct LocalProvider {
    issuer: String,
    factors: Mutex<HashMap<Uuid, Vec<FactorRecord>>>,
    challenges: Mutex<HashMap<Uuid, ChallengeRecord>>,
    assurance: Mutex<HashMap<Uuid, AssuranceLevel>>,
    signed_out: Mutex<HashSet<Uuid>>,
}

impl LocalProvider {
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            factors: Mutex::new(HashMap::new()),
            challenges: Mutex::new(HashMap::new()),
            assurance: Mutex::new(HashMap::new()),
            signed_out: Mutex::new(HashSet::new()),
        }
    }

    /// Whether `sign_out` was called for this user.
    pub fn is_signed_out(&self, user_id: Uuid) -> bool {
        self.signed_out.lock().unwrap().contains(&user_id)
    }

    fn verify_code(secret: &str, code: &str) -> Result<bool> {
        let secret_bytes = base32::decode(Alphabet::Rfc4648 { padding: false }, secret)
            .ok_or_else(|| AuthError::Internal("Invalid secret format".to_string()))?;

        let time = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|e| AuthError::Internal(format!("Time error: {}", e)))?
            .as_secs();

        // Check current time and ±1 step to tolerate clock drift
        for time_offset in [-1i64, 0, 1] {
            let check_time = (time as i64 + (time_offset * TOTP_STEP as i64)) as u64;
            let expected = totp_custom::<Sha1>(TOTP_STEP, TOTP_DIGITS, &secret_bytes, check_time);

            if constant_time_compare(&expected, code) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[async_trait]
impl IdentityProvider for LocalProvider {
    async fn list_factors(&self, user: &UserContext) -> Result<Vec<AuthFactor>> {
        let factors = self.factors.lock().unwrap();
        Ok(factors
            .get(&user.user_id)
            .map(|records| records.iter().map(|r| r.factor.clone()).collect())
            .unwrap_or_default())
    }

    async fn enroll_totp(
        &self,
        user: &UserContext,
        friendly_name: Option<&str>,
    ) -> Result<TotpProvisioning> {
        let secret = generate_secret();
        let factor_id = Uuid::new_v4();
        let otpauth_uri = otpauth_uri(&secret, &user.email, &self.issuer);
        let qr_png = render_qr_png(&otpauth_uri)?;

        let factor = AuthFactor {
            id: factor_id,
            factor_type: FactorType::Totp,
            status: FactorStatus::Unverified,
            friendly_name: friendly_name.map(str::to_string),
            created_at: Utc::now(),
        };

        self.factors
            .lock()
            .unwrap()
            .entry(user.user_id)
            .or_default()
            .push(FactorRecord {
                factor,
                secret: secret.clone(),
            });

        Ok(TotpProvisioning {
            factor_id,
            secret,
            otpauth_uri,
            qr_png,
        })
    }

    async fn create_challenge(&self, user: &UserContext, factor_id: Uuid) -> Result<Challenge> {
        {
            let factors = self.factors.lock().unwrap();
            let known = factors
                .get(&user.user_id)
                .map(|records| records.iter().any(|r| r.factor.id == factor_id))
                .unwrap_or(false);
            if !known {
                return Err(AuthError::FactorNotFound);
            }
        }

        let challenge_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::seconds(CHALLENGE_TTL_SECS);

        self.challenges.lock().unwrap().insert(
            challenge_id,
            ChallengeRecord {
                user_id: user.user_id,
                factor_id,
                expires_at,
            },
        );

        Ok(Challenge {
            id: challenge_id,
            factor_id,
            expires_at,
        })
    }

    async fn verify_challenge(
        &self,
        user: &UserContext,
        factor_id: Uuid,
        challenge_id: Uuid,
        code: &str,
    ) -> Result<()> {
        let secret = {
            let challenges = self.challenges.lock().unwrap();
            let challenge = challenges
                .get(&challenge_id)
                .filter(|c| c.user_id == user.user_id && c.factor_id == factor_id)
                .ok_or(AuthError::FactorNotFound)?;

            if challenge.expires_at < Utc::now() {
                return Err(AuthError::InvalidMfaCode);
            }

            let factors = self.factors.lock().unwrap();
            factors
                .get(&user.user_id)
                .and_then(|records| records.iter().find(|r| r.factor.id == factor_id))
                .map(|r| r.secret.clone())
                .ok_or(AuthError::FactorNotFound)?
        };

        if !Self::verify_code(&secret, code)? {
            return Err(AuthError::InvalidMfaCode);
        }

        // Challenges are single-use
        self.challenges.lock().unwrap().remove(&challenge_id);

        let mut factors = self.factors.lock().unwrap();
        if let Some(record) = factors
            .get_mut(&user.user_id)
            .and_then(|records| records.iter_mut().find(|r| r.factor.id == factor_id))
        {
            record.factor.status = FactorStatus::Verified;
        }

        self.assurance
            .lock()
            .unwrap()
            .insert(user.user_id, AssuranceLevel::Aal2);
        self.signed_out.lock().unwrap().remove(&user.user_id);

        Ok(())
    }

    async fn unenroll_factor(&self, user: &UserContext, factor_id: Uuid) -> Result<()> {
        let mut factors = self.factors.lock().unwrap();
        let records = factors
            .get_mut(&user.user_id)
            .ok_or(AuthError::FactorNotFound)?;

        let before = records.len();
        records.retain(|r| r.factor.id != factor_id);
        if records.len() == before {
            return Err(AuthError::FactorNotFound);
        }

        Ok(())
    }

    async fn assurance_level(&self, user: &UserContext) -> Result<AssuranceLevel> {
        Ok(self
            .assurance
            .lock()
            .unwrap()
            .get(&user.user_id)
            .copied()
            .unwrap_or(AssuranceLevel::Aal1))
    }

    async fn sign_out(&self, user: &UserContext) -> Result<()> {
        self.assurance.lock().unwrap().remove(&user.user_id);
        self.signed_out.lock().unwrap().insert(user.user_id);
        Ok(())
    }
}

/// Generate a random 20-byte secret, base32-encoded for authenticator apps.
pub fn generate_secret() -> String {
    let mut rng = rand::thread_rng();
    let secret_bytes: Vec<u8> = (0..20).map(|_| rng.gen()).collect();
    base32::encode(Alphabet::Rfc4648 { padding: false }, &secret_bytes)
}

/// The current 6-digit code for a secret. Used by enrollment confirmation in
/// tests and the dev CLI path.
pub fn current_code(secret: &str) -> Result<String> {
    let secret_bytes = base32::decode(Alphabet::Rfc4648 { padding: false }, secret)
        .ok_or_else(|| AuthError::Internal("Invalid secret format".to_string()))?;

    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| AuthError::Internal(format!("Time error: {}", e)))?
        .as_secs();

    Ok(totp_custom::<Sha1>(TOTP_STEP, TOTP_DIGITS, &secret_bytes, time))
}

/// otpauth:// URI in the format authenticator apps expect.
fn otpauth_uri(secret: &str, account_name: &str, issuer: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account_name),
        secret,
        urlencoding::encode(issuer),
        TOTP_DIGITS,
        TOTP_STEP
    )
}

/// Render an otpauth URI as PNG bytes.
fn render_qr_png(uri: &str) -> Result<Vec<u8>> {
    let qr = QrCode::new(uri.as_bytes())
        .map_err(|e| AuthError::Internal(format!("QR code generation failed: {}", e)))?;

    let image = qr.render::<Luma<u8>>().min_dimensions(256, 256).build();

    let mut png_bytes = Vec::new();
    image::DynamicImage::ImageLuma8(image)
        .write_to(&mut std::io::Cursor::new(&mut png_bytes), image::ImageFormat::Png)
        .map_err(|e| AuthError::Internal(format!("PNG encoding failed: {}", e)))?;

    Ok(png_bytes)
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut result = 0u8;
    for i in 0..a_bytes.len() {
        result |= a_bytes[i] ^ b_bytes[i];
    }

    result == 0
}
