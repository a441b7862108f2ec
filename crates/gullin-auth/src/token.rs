//! Bearer tokens (EdDSA JWT) and opaque session handles.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: account ID (UUID string).
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Issued-at of the login that started this token chain. Preserved
    /// across refreshes to bound how long a chain may be extended.
    pub orig_iat: i64,
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("bad subject: {e}")))
    }
}

fn sign(claims: &AccessTokenClaims, config: &AuthConfig) -> Result<String, AuthError> {
    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
}

fn claims_at(account_id: Uuid, orig_iat: i64, config: &AuthConfig) -> AccessTokenClaims {
    let now = Utc::now().timestamp();
    AccessTokenClaims {
        sub: account_id.to_string(),
        iss: config.jwt_issuer.clone(),
        iat: now,
        exp: now + config.access_token_lifetime_secs as i64,
        orig_iat,
        jti: Uuid::new_v4().to_string(),
    }
}

/// Issue a signed bearer token for a fresh login.
pub fn issue_access_token(account_id: Uuid, config: &AuthConfig) -> Result<String, AuthError> {
    let claims = claims_at(account_id, Utc::now().timestamp(), config);
    sign(&claims, config)
}

/// Issue a new token continuing the chain of `previous`.
///
/// Fails with [`AuthError::TokenExpired`] once the original login is
/// older than the configured refresh window.
pub fn reissue_access_token(
    previous: &AccessTokenClaims,
    config: &AuthConfig,
) -> Result<String, AuthError> {
    let age = Utc::now().timestamp() - previous.orig_iat;
    if age > config.refresh_window_secs as i64 {
        return Err(AuthError::TokenExpired);
    }

    let claims = claims_at(previous.account_id()?, previous.orig_iat, config);
    sign(&claims, config)
}

/// Decode and verify an EdDSA bearer token.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// Generate a cryptographically random opaque session handle
/// (32 bytes → base64url-encoded, no padding).
pub fn generate_session_handle() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rand::Rng::random(&mut rng);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of a raw session handle, hex-encoded. Challenge stores key
/// their entries by this digest rather than the raw handle.
pub fn hash_session_handle(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
