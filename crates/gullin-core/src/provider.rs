//! External identity verification provider contract.

use serde::{Deserialize, Serialize};

use crate::error::GullinResult;
use crate::models::identity::IdentityState;

/// Applicant data sent to the provider. Field names are the provider's
/// wire names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderPayload {
    /// Merchant-side account name (the applicant email).
    pub man: String,
    /// Applicant email.
    pub tea: String,
    pub bfn: String,
    pub bln: String,
    /// Date of birth, ISO 8601.
    pub dob: String,
    pub bsn: String,
    pub bc: String,
    pub bs: String,
    pub bz: String,
    pub bco: String,
    pub ip: Option<String>,
    pub phn: String,
    pub stage: u32,
}

/// Parsed provider answer.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub transaction_id: String,
    pub state: IdentityState,
    /// Raw body, kept for the audit note.
    pub raw: serde_json::Value,
}

pub trait IdentityProvider: Send + Sync {
    /// Submit an applicant. Transport failures, timeouts and unparseable
    /// answers surface as `ProviderUnavailable`; a rejected payload as
    /// `ValidationFailed`.
    fn submit(
        &self,
        payload: &ProviderPayload,
    ) -> impl Future<Output = GullinResult<ProviderResponse>> + Send;
}
