//! Error types for the Gullin platform.
//!
//! Every workflow failure is a typed, recoverable variant. Callers map
//! them to responses through [`GullinError::kind`] (stable machine code)
//! and [`GullinError::public_message`] (human-readable, never leaks
//! internal detail). Only [`GullinError::Database`] is fatal and it is
//! propagated unmodified.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GullinError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("verification code does not match")]
    CodeMismatch,

    #[error("verification code has expired")]
    CodeExpired,

    #[error("no pending login or reset challenge for this session")]
    NoPendingChallenge,

    #[error("account not found")]
    AccountNotFound,

    #[error("account is inactive")]
    AccountInactive,

    #[error("a wallet is already linked to this profile")]
    AlreadyLinked,

    #[error("not eligible: {reason}")]
    NotEligible { reason: String },

    #[error("identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("current password does not match")]
    CurrentPasswordMismatch,

    #[error("a user with this phone number already exists")]
    DuplicatePhone,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    ExpiredToken,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GullinError {
    pub fn not_eligible(reason: impl Into<String>) -> Self {
        Self::NotEligible {
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Stable, machine-checkable error code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::CodeMismatch => "code_mismatch",
            Self::CodeExpired => "code_expired",
            Self::NoPendingChallenge => "no_pending_challenge",
            Self::AccountNotFound => "account_not_found",
            Self::AccountInactive => "account_inactive",
            Self::AlreadyLinked => "already_linked",
            Self::NotEligible { .. } => "not_eligible",
            Self::ProviderUnavailable(_) => "provider_unavailable",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::CurrentPasswordMismatch => "current_password_mismatch",
            Self::DuplicatePhone => "duplicate_phone",
            Self::InvalidToken(_) => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => "internal",
        }
    }

    /// Message safe to show to an end user.
    pub fn public_message(&self) -> String {
        match self {
            Self::CodeMismatch => {
                "Verification code doesn't match, please try again or request another code.".into()
            }
            Self::CodeExpired => "Verification code expired, please request another code.".into(),
            Self::NoPendingChallenge => "You have to login first!".into(),
            Self::AccountNotFound => "Unable to locate your account".into(),
            Self::AlreadyLinked => "You are already bound with a wallet".into(),
            Self::ProviderUnavailable(_) => {
                "Identity verification is temporarily unavailable, please try again later.".into()
            }
            Self::InvalidToken(_) => "invalid token".into(),
            Self::Database(_) | Self::Crypto(_) | Self::Internal(_) => {
                "An internal error occurred.".into()
            }
            other => other.to_string(),
        }
    }

    /// Whether the failure is the unrecoverable store condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

pub type GullinResult<T> = Result<T, GullinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = GullinError::Database("connection reset by peer at 10.0.0.4".into());
        assert_eq!(err.kind(), "internal");
        assert!(!err.public_message().contains("10.0.0.4"));
        assert!(err.is_fatal());
    }

    #[test]
    fn provider_detail_is_not_exposed() {
        let err = GullinError::ProviderUnavailable("HTTP 502 from upstream".into());
        assert_eq!(err.kind(), "provider_unavailable");
        assert!(!err.public_message().contains("502"));
    }

    #[test]
    fn workflow_errors_keep_their_message() {
        let err = GullinError::not_eligible("level must be IDVerified");
        assert_eq!(err.kind(), "not_eligible");
        assert!(err.public_message().contains("IDVerified"));
        assert!(!err.is_fatal());
    }
}
