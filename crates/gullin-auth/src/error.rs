//! Errors from the cryptographic primitives of this crate.

use gullin_core::error::GullinError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("TOTP is not configured")]
    TotpUnavailable,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for GullinError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => GullinError::ExpiredToken,
            AuthError::TokenInvalid(msg) => GullinError::InvalidToken(msg),
            AuthError::TotpUnavailable => GullinError::not_eligible(err.to_string()),
            AuthError::Crypto(msg) => GullinError::Crypto(msg),
        }
    }
}
