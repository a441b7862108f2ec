//! SurrealDB repository implementations.

mod account;
mod activity;
mod identity;
mod investor;
mod verification_code;

pub use account::SurrealAccountRepository;
pub use activity::SurrealActivityLogRepository;
pub use identity::SurrealIdentityVerificationRepository;
pub use investor::SurrealInvestorProfileRepository;
pub use verification_code::SurrealVerificationCodeRepository;

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for id-only lookups via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Corrupt(format!("invalid {what} UUID: {e}")))
}
