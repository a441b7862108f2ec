//! Identity verification (KYC) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OfficialIdType {
    DriverLicense,
    PhotoId,
    Passport,
}

/// State of an identity verification record.
///
/// `Pending` means submitted locally with no provider verdict yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IdentityState {
    Pending,
    UnderReview,
    Accepted,
    Rejected,
}

impl IdentityState {
    /// Map a provider state code (`A`, `R`, `D`).
    pub fn from_provider_code(code: &str) -> Option<Self> {
        match code {
            "A" => Some(Self::Accepted),
            "R" => Some(Self::UnderReview),
            "D" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Document references supplied by the investor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityDocuments {
    pub id_type: OfficialIdType,
    pub front: String,
    pub back: Option<String>,
    /// Photo of the investor holding the document.
    pub holding: Option<String>,
    /// Nationality printed on the document.
    pub nationality: String,
}

/// One record per investor profile; resubmissions overwrite the
/// documents and append to `notes`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityVerificationRecord {
    pub profile_id: Uuid,
    pub documents: IdentityDocuments,
    pub transaction_id: Option<String>,
    pub state: IdentityState,
    pub stage: u32,
    pub processed: bool,
    pub notes: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
