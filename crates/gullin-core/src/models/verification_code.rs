//! Verification code domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single live numeric code of an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCode {
    pub account_id: Uuid,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Result of an atomic compare-and-expire against the stored code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeConsumption {
    /// The code matched, was live, and has now been expired.
    Consumed,
    Mismatch,
    Expired,
}
