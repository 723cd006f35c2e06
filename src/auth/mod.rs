use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user's id
    pub sub: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        let expiry_days = config::config().security.jwt_expiry_days;
        let exp = (now + Duration::days(expiry_days)).timestamp();

        Self {
            sub: user_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Token issuance/validation failures. Validation failures are deliberately a
/// single variant: the caller must not be able to tell an expired token from
/// a forged one.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token generation failed: {0}")]
    Generation(String),
    #[error("JWT secret not configured")]
    MissingSecret,
    #[error("invalid or expired token")]
    Invalid,
}

/// Issue a signed session token for a user. Fixed lifetime, no refresh,
/// no revocation list.
pub fn issue(user_id: Uuid) -> Result<String, TokenError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, &Claims::new(user_id), &encoding_key)
        .map_err(|e| TokenError::Generation(e.to_string()))
}

/// Verify signature and expiry, returning the claims. Malformed, expired and
/// bad-signature tokens all collapse to `TokenError::Invalid`.
pub fn validate(token: &str) -> Result<Claims, TokenError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|_| TokenError::Invalid)
}

/// Best-effort payload extraction WITHOUT signature or expiry checks.
///
/// Non-authoritative: the claims returned here may be forged or stale. Only
/// suitable for diagnostics such as audit logging of failed logins. Must
/// never feed an authorization decision; `validate` is the only entry point
/// for those.
pub fn decode_unverified(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .ok()
}
