//! Short-lived numeric verification codes.
//!
//! Each account owns exactly one code record. Refreshing overwrites it,
//! so only the newest code is ever live.

use chrono::{Duration, Utc};
use gullin_core::error::{GullinError, GullinResult};
use gullin_core::models::verification_code::{CodeConsumption, VerificationCode};
use gullin_core::repository::VerificationCodeRepository;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use crate::config::AuthConfig;

/// Uniformly random string of `length` decimal digits.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

pub struct VerificationCodeIssuer<'a, R: VerificationCodeRepository> {
    repo: &'a R,
    lifetime: Duration,
    length: usize,
}

impl<'a, R: VerificationCodeRepository> VerificationCodeIssuer<'a, R> {
    pub fn new(repo: &'a R, config: &AuthConfig) -> Self {
        Self {
            repo,
            lifetime: Duration::seconds(config.code_lifetime_secs as i64),
            length: config.code_length,
        }
    }

    /// Lifetime of a freshly issued code, in whole minutes.
    pub fn lifetime_minutes(&self) -> i64 {
        self.lifetime.num_minutes()
    }

    /// Generate a new code valid for the configured lifetime, replacing
    /// whatever code the account had.
    pub async fn refresh(&self, account_id: Uuid) -> GullinResult<VerificationCode> {
        let code = generate_code(self.length);
        let stored = self
            .repo
            .store(account_id, &code, Utc::now() + self.lifetime)
            .await?;
        debug!(account_id = %account_id, "Verification code refreshed");
        Ok(stored)
    }

    /// Force the current code to read as expired.
    pub async fn expire(&self, account_id: Uuid) -> GullinResult<()> {
        self.repo.expire(account_id, Utc::now()).await
    }

    pub fn is_expired(&self, code: &VerificationCode) -> bool {
        code.is_expired()
    }

    /// Check `submitted` without consuming the code.
    pub async fn verify(&self, account_id: Uuid, submitted: &str) -> GullinResult<()> {
        let code = self.repo.get(account_id).await?;
        if code.code.is_empty() || self.is_expired(&code) {
            return Err(GullinError::CodeExpired);
        }
        if code.code != submitted.trim() {
            return Err(GullinError::CodeMismatch);
        }
        Ok(())
    }

    /// Verify and expire in one atomic step. Of several concurrent
    /// callers with the right code, exactly one succeeds and the rest
    /// see [`GullinError::CodeExpired`].
    pub async fn consume(&self, account_id: Uuid, submitted: &str) -> GullinResult<()> {
        match self
            .repo
            .consume(account_id, submitted.trim(), Utc::now())
            .await?
        {
            CodeConsumption::Consumed => Ok(()),
            CodeConsumption::Expired => Err(GullinError::CodeExpired),
            CodeConsumption::Mismatch => Err(GullinError::CodeMismatch),
        }
    }
}
