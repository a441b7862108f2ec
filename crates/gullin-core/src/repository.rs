//! Storage seams for accounts, codes, profiles and identity records.
//!
//! All repository operations are async. Operations that guard a state
//! transition (`consume`, `transition_level`) are single conditional
//! updates in the store, never read-then-write.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::GullinResult;
use crate::models::{
    account::{Account, CreateAccount, UpdateAccount},
    activity::{ActivityLogEntry, CreateActivityLogEntry},
    identity::{IdentityDocuments, IdentityState, IdentityVerificationRecord},
    investor::{Address, InvestorProfile, UpdateInvestorProfile, VerificationLevel},
    verification_code::{CodeConsumption, VerificationCode},
};

/// Default page size for list queries.
pub const PAGE_SIZE: u64 = 50;

/// Window into a list query.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Zero-based page of [`PAGE_SIZE`] items.
    pub fn page(page: u64) -> Self {
        Self {
            offset: page * PAGE_SIZE,
            limit: PAGE_SIZE,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: PAGE_SIZE,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// Accounts

pub trait AccountRepository: Send + Sync {
    /// Create the account, its verification code and (when requested)
    /// its investor profile in one transaction.
    fn create(&self, input: CreateAccount) -> impl Future<Output = GullinResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GullinResult<Account>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = GullinResult<Account>> + Send;
    /// Look up by phone. `+<digits>` is read as E.164 and matched against
    /// the (country code, number) pair; anything else is a national
    /// number. A national number shared across country codes matches
    /// nothing.
    fn get_by_phone(&self, phone: &str) -> impl Future<Output = GullinResult<Account>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = GullinResult<Account>> + Send;
    /// Fails with `AlreadyExists { entity: "phone" }` when another account
    /// holds the same (country code, phone) pair.
    fn set_phone(
        &self,
        id: Uuid,
        country_code: &str,
        phone: &str,
    ) -> impl Future<Output = GullinResult<Account>> + Send;
    /// Soft-delete: clears `is_active`.
    fn deactivate(&self, id: Uuid) -> impl Future<Output = GullinResult<()>> + Send;
}

// Verification codes (one per account)

pub trait VerificationCodeRepository: Send + Sync {
    fn get(&self, account_id: Uuid) -> impl Future<Output = GullinResult<VerificationCode>> + Send;
    /// Overwrite the account's code, invalidating the previous one.
    fn store(
        &self,
        account_id: Uuid,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = GullinResult<VerificationCode>> + Send;
    /// Force the code to expire at `now`.
    fn expire(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = GullinResult<()>> + Send;
    /// Atomic compare-and-expire: expires the code only if it equals
    /// `submitted` and is still live at `now`.
    fn consume(
        &self,
        account_id: Uuid,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = GullinResult<CodeConsumption>> + Send;
}

// Investor profiles

/// A guarded verification-level change, optionally carrying the fields
/// that move together with the level.
#[derive(Debug, Clone)]
pub struct LevelTransition {
    pub from: VerificationLevel,
    pub to: VerificationLevel,
    pub nationality: Option<String>,
    pub wallet_address: Option<String>,
}

impl LevelTransition {
    pub fn new(from: VerificationLevel, to: VerificationLevel) -> Self {
        Self {
            from,
            to,
            nationality: None,
            wallet_address: None,
        }
    }
}

pub trait InvestorProfileRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GullinResult<InvestorProfile>> + Send;
    fn get_by_account(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = GullinResult<InvestorProfile>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateInvestorProfile,
    ) -> impl Future<Output = GullinResult<InvestorProfile>> + Send;
    fn set_address(
        &self,
        id: Uuid,
        address: Address,
    ) -> impl Future<Output = GullinResult<InvestorProfile>> + Send;
    /// Apply the transition only if the stored level still equals
    /// `transition.from`. Returns `None` when it does not.
    fn transition_level(
        &self,
        id: Uuid,
        transition: LevelTransition,
    ) -> impl Future<Output = GullinResult<Option<InvestorProfile>>> + Send;
}

// Identity verification (one record per investor profile)

pub trait IdentityVerificationRepository: Send + Sync {
    fn get_by_profile(
        &self,
        profile_id: Uuid,
    ) -> impl Future<Output = GullinResult<Option<IdentityVerificationRecord>>> + Send;
    /// Create or overwrite the submission: state `Pending`, not processed,
    /// `note` appended to the audit trail.
    fn submit(
        &self,
        profile_id: Uuid,
        documents: IdentityDocuments,
        note: String,
    ) -> impl Future<Output = GullinResult<IdentityVerificationRecord>> + Send;
    fn record_provider_response(
        &self,
        profile_id: Uuid,
        transaction_id: String,
        state: IdentityState,
        note: String,
    ) -> impl Future<Output = GullinResult<IdentityVerificationRecord>> + Send;
    /// Final verdict: sets state and marks the record processed.
    fn set_verdict(
        &self,
        profile_id: Uuid,
        state: IdentityState,
        note: String,
    ) -> impl Future<Output = GullinResult<IdentityVerificationRecord>> + Send;
    fn append_note(
        &self,
        profile_id: Uuid,
        note: String,
    ) -> impl Future<Output = GullinResult<IdentityVerificationRecord>> + Send;
}

// Activity log (append-only)

pub trait ActivityLogRepository: Send + Sync {
    fn append(
        &self,
        input: CreateActivityLogEntry,
    ) -> impl Future<Output = GullinResult<ActivityLogEntry>> + Send;
    /// Newest first.
    fn list_for_account(
        &self,
        account_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = GullinResult<PaginatedResult<ActivityLogEntry>>> + Send;
}

// Aggregate

/// Access to every repository backed by one durable store.
pub trait Store: Send + Sync {
    type Accounts: AccountRepository;
    type Codes: VerificationCodeRepository;
    type Profiles: InvestorProfileRepository;
    type Identities: IdentityVerificationRepository;
    type Activity: ActivityLogRepository;

    fn accounts(&self) -> &Self::Accounts;
    fn codes(&self) -> &Self::Codes;
    fn profiles(&self) -> &Self::Profiles;
    fn identities(&self) -> &Self::Identities;
    fn activity(&self) -> &Self::Activity;
}
