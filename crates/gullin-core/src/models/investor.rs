//! Investor profile and verification levels.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Nationality that unlocks the accredited-investor flow.
pub const UNITED_STATES: &str = "United States";

/// Ordinal verification stages. The integer values are the persisted
/// representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i8)]
pub enum VerificationLevel {
    NotVerified = -1,
    EmailVerified = 0,
    PhoneVerified = 1,
    WalletLinked = 2,
    IdProcessing = 3,
    IdVerified = 4,
    AccreditedProcessing = 5,
    AccreditedVerified = 6,
}

impl VerificationLevel {
    pub fn as_i64(self) -> i64 {
        self as i8 as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::NotVerified),
            0 => Some(Self::EmailVerified),
            1 => Some(Self::PhoneVerified),
            2 => Some(Self::WalletLinked),
            3 => Some(Self::IdProcessing),
            4 => Some(Self::IdVerified),
            5 => Some(Self::AccreditedProcessing),
            6 => Some(Self::AccreditedVerified),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::NotVerified => "Not Verified",
            Self::EmailVerified => "Email Verified",
            Self::PhoneVerified => "Phone Verified",
            Self::WalletLinked => "Wallet Linked",
            Self::IdProcessing => "ID Processing",
            Self::IdVerified => "ID Verified",
            Self::AccreditedProcessing => "Accredited Investor Processing",
            Self::AccreditedVerified => "Accredited Investor Verified",
        }
    }
}

impl std::fmt::Display for VerificationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.as_i64())
    }
}

/// Postal address used for identity verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub address1: String,
    pub address2: Option<String>,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    /// ISO 3166 country code.
    pub country: String,
}

impl Address {
    /// Street lines joined the way the identity provider expects them.
    pub fn street(&self) -> String {
        match self.address2.as_deref().filter(|s| !s.is_empty()) {
            Some(line2) => format!("{}, {}", self.address1, line2),
            None => self.address1.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birthday: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub verification_level: VerificationLevel,
    pub wallet_address: Option<String>,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InvestorProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn is_us_national(&self) -> bool {
        self.nationality.as_deref() == Some(UNITED_STATES)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInvestorProfile {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateInvestorProfile {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub nationality: Option<String>,
}
