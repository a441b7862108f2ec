//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::investor::{CreateInvestorProfile, InvestorProfile};

/// The role that decides which profile is attached to an account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PrimaryRole {
    Investor,
    CompanyUser,
    Analyst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// Dialling prefix including the leading `+`, e.g. `+1`.
    pub phone_country_code: Option<String>,
    pub phone: Option<String>,
    pub password_hash: String,
    pub last_login_at: DateTime<Utc>,
    pub last_login_ip: Option<String>,
    pub totp_enabled: bool,
    /// AES-256-GCM encrypted TOTP secret (if enrolled).
    pub totp_secret: Option<String>,
    pub is_investor: bool,
    pub is_company: bool,
    pub is_analyst: bool,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Phone number in E.164 form, if one is on file.
    pub fn phone_e164(&self) -> Option<String> {
        match (&self.phone_country_code, &self.phone) {
            (Some(prefix), Some(number)) => Some(format!("{prefix}{number}")),
            _ => None,
        }
    }

    /// Investor wins over company, company over analyst.
    pub fn primary_role(&self) -> Option<PrimaryRole> {
        if self.is_investor {
            Some(PrimaryRole::Investor)
        } else if self.is_company {
            Some(PrimaryRole::CompanyUser)
        } else if self.is_analyst {
            Some(PrimaryRole::Analyst)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub email: String,
    /// Argon2id PHC string; hashing happens in the auth layer.
    pub password_hash: String,
    pub last_login_ip: Option<String>,
    pub is_investor: bool,
    pub is_company: bool,
    pub is_analyst: bool,
    /// Investor profile created in the same transaction as the account.
    pub investor: Option<CreateInvestorProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAccount {
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub password_hash: Option<String>,
    pub totp_enabled: Option<bool>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub totp_secret: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanyProfile {
    pub account_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalystProfile {
    pub account_id: Uuid,
}

/// Profile attached to an account, resolved once when the account is
/// loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccountRole {
    Investor(InvestorProfile),
    CompanyUser(CompanyProfile),
    Analyst(AnalystProfile),
}

impl AccountRole {
    pub fn investor(&self) -> Option<&InvestorProfile> {
        match self {
            Self::Investor(profile) => Some(profile),
            _ => None,
        }
    }
}
