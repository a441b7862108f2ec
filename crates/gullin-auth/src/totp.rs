//! Authenticator-app (TOTP) second factor.
//!
//! Secrets are stored AES-256-GCM encrypted as
//! `base64(nonce || ciphertext || tag)`.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AuthError;

const NONCE_LEN: usize = 12;

/// A freshly generated authenticator secret.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// Base32 secret for manual entry.
    pub secret: String,
    /// `otpauth://` URI for QR codes.
    pub uri: String,
    /// Encrypted raw secret, ready to persist.
    pub encrypted_secret: String,
}

fn build(secret_bytes: Vec<u8>, issuer: &str, account: &str) -> Result<TOTP, AuthError> {
    // RFC 6238 defaults: SHA1, 6 digits, 30 s step, one step of skew.
    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| AuthError::Crypto(format!("TOTP init: {e}")))
}

pub fn encrypt_secret(key: &[u8; 32], plaintext: &[u8]) -> Result<String, AuthError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM encrypt: {e}")))?;

    let mut combined = nonce_bytes.to_vec();
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(combined))
}

pub fn decrypt_secret(key: &[u8; 32], encoded: &str) -> Result<Vec<u8>, AuthError> {
    let combined = STANDARD
        .decode(encoded)
        .map_err(|e| AuthError::Crypto(format!("base64 decode: {e}")))?;

    if combined.len() <= NONCE_LEN {
        return Err(AuthError::Crypto("ciphertext too short".into()));
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key))
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| AuthError::Crypto(format!("AES-GCM decrypt: {e}")))
}

/// Generate a new secret for `account` and encrypt it with `key`.
pub fn enroll(key: &[u8; 32], issuer: &str, account: &str) -> Result<TotpEnrollment, AuthError> {
    let secret = Secret::generate_secret();
    let secret_bytes = secret
        .to_bytes()
        .map_err(|e| AuthError::Crypto(format!("secret bytes: {e}")))?;

    let encrypted_secret = encrypt_secret(key, &secret_bytes)?;
    let uri = build(secret_bytes, issuer, account)?.get_url();

    Ok(TotpEnrollment {
        secret: secret.to_encoded().to_string(),
        uri,
        encrypted_secret,
    })
}

/// Check `code` against an encrypted stored secret.
pub fn verify(
    key: &[u8; 32],
    encrypted_secret: &str,
    code: &str,
    issuer: &str,
    account: &str,
) -> Result<bool, AuthError> {
    let secret_bytes = decrypt_secret(key, encrypted_secret)?;
    build(secret_bytes, issuer, account)?
        .check_current(code.trim())
        .map_err(|e| AuthError::Crypto(format!("TOTP check: {e}")))
}
