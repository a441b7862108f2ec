//! Identity verification coordinator.
//!
//! Builds the provider payload, persists the submission, then calls the
//! provider. The record is written before any network I/O, so a failed or
//! timed-out call leaves a `Pending` record whose notes say what happened.

use gullin_core::error::{GullinError, GullinResult};
use gullin_core::models::account::Account;
use gullin_core::models::identity::{IdentityDocuments, IdentityState, IdentityVerificationRecord};
use gullin_core::models::investor::{InvestorProfile, VerificationLevel};
use gullin_core::provider::{IdentityProvider, ProviderPayload};
use gullin_core::repository::IdentityVerificationRepository;
use tracing::{info, warn};
use uuid::Uuid;

/// First screening stage of the provider.
pub const SCREENING_STAGE: u32 = 1;

/// Applicant data for the screening stage. Fails with
/// `ValidationFailed` when the profile lacks an address, birthday or
/// phone number.
pub fn build_payload(
    account: &Account,
    profile: &InvestorProfile,
) -> GullinResult<ProviderPayload> {
    let address = profile
        .address
        .as_ref()
        .ok_or_else(|| GullinError::validation("an address is required for identity verification"))?;
    let birthday = profile
        .birthday
        .ok_or_else(|| GullinError::validation("a birthday is required for identity verification"))?;
    let phone = account
        .phone_e164()
        .ok_or_else(|| GullinError::validation("a phone number is required for identity verification"))?;

    Ok(ProviderPayload {
        man: account.email.clone(),
        tea: account.email.clone(),
        bfn: profile.first_name.clone(),
        bln: profile.last_name.clone(),
        dob: birthday.format("%Y-%m-%d").to_string(),
        bsn: address.street(),
        bc: address.city.clone(),
        bs: address.state.clone(),
        bz: address.zipcode.clone(),
        bco: address.country.clone(),
        ip: account.last_login_ip.clone(),
        phn: phone,
        stage: SCREENING_STAGE,
    })
}

#[derive(Debug, Clone)]
pub struct SubmissionReceipt {
    pub record: IdentityVerificationRecord,
    pub transaction_id: String,
    pub provider_state: IdentityState,
    /// Profile level once the provider answer has been applied.
    pub level: VerificationLevel,
}

pub struct IdentityVerificationCoordinator<'a, R, P>
where
    R: IdentityVerificationRepository,
    P: IdentityProvider,
{
    records: &'a R,
    provider: &'a P,
}

impl<'a, R, P> IdentityVerificationCoordinator<'a, R, P>
where
    R: IdentityVerificationRepository,
    P: IdentityProvider,
{
    pub fn new(records: &'a R, provider: &'a P) -> Self {
        Self { records, provider }
    }

    /// Build the payload and submit it.
    pub async fn submit(
        &self,
        account: &Account,
        profile: &InvestorProfile,
        documents: IdentityDocuments,
    ) -> GullinResult<SubmissionReceipt> {
        let payload = build_payload(account, profile)?;
        self.submit_payload(profile, documents, &payload).await
    }

    /// Persist the submission, call the provider and record its answer.
    ///
    /// Resubmissions reuse the profile's single record; the previous
    /// answers are overwritten and the notes keep growing.
    pub async fn submit_payload(
        &self,
        profile: &InvestorProfile,
        documents: IdentityDocuments,
        payload: &ProviderPayload,
    ) -> GullinResult<SubmissionReceipt> {
        let note = format!("Submitted {:?} for stage {}", documents.id_type, payload.stage);
        self.records.submit(profile.id, documents, note).await?;

        let response = match self.provider.submit(payload).await {
            Ok(response) => response,
            Err(e) => {
                warn!(profile_id = %profile.id, error = %e, "Identity submission left pending");
                self.records
                    .append_note(profile.id, format!("Provider call failed: {e}"))
                    .await?;
                return Err(match e {
                    err @ (GullinError::ProviderUnavailable(_)
                    | GullinError::ValidationFailed { .. }) => err,
                    other => GullinError::ProviderUnavailable(other.to_string()),
                });
            }
        };

        let record = self
            .records
            .record_provider_response(
                profile.id,
                response.transaction_id.clone(),
                response.state,
                response.raw.to_string(),
            )
            .await?;

        info!(
            profile_id = %profile.id,
            transaction_id = %response.transaction_id,
            state = ?response.state,
            "Identity submission recorded"
        );

        Ok(SubmissionReceipt {
            record,
            transaction_id: response.transaction_id,
            provider_state: response.state,
            level: profile.verification_level,
        })
    }

    pub async fn record_for(&self, profile_id: Uuid) -> GullinResult<IdentityVerificationRecord> {
        self.records
            .get_by_profile(profile_id)
            .await?
            .ok_or_else(|| GullinError::not_eligible("no identity verification has been submitted"))
    }
}
