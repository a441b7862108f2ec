//! Investor verification service.
//!
//! Every level change goes through [`levels::next_level`] and is written
//! as a compare-and-set on the stored level. When a concurrent request
//! moved the level first, the profile is re-read and the event is
//! re-evaluated against the fresh state.
//!
//! State is always persisted before anything is sent; emails and SMS are
//! best-effort.

use gullin_auth::dispatch::{self, CodeChannel};
use gullin_auth::{AuthConfig, VerificationCodeIssuer};
use gullin_core::error::{GullinError, GullinResult};
use gullin_core::models::account::Account;
use gullin_core::models::identity::{IdentityDocuments, IdentityState, IdentityVerificationRecord};
use gullin_core::models::investor::{
    Address, InvestorProfile, UpdateInvestorProfile, VerificationLevel,
};
use gullin_core::notification::{EmailMessage, NotificationGateway, templates};
use gullin_core::provider::IdentityProvider;
use gullin_core::repository::{
    AccountRepository, IdentityVerificationRepository, InvestorProfileRepository, LevelTransition,
    Store,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::KycConfig;
use crate::coordinator::{self, IdentityVerificationCoordinator, SubmissionReceipt};
use crate::levels::{self, LevelEvent};

const MAX_TRANSITION_ATTEMPTS: usize = 3;

/// Outcome of an identity verdict.
#[derive(Debug, Clone)]
pub struct IdentityVerdict {
    pub profile: InvestorProfile,
    pub record: IdentityVerificationRecord,
    /// Whether the profile may now request accredited investor
    /// verification.
    pub accredited_eligible: bool,
}

/// Fields written together with a level change.
#[derive(Debug, Default)]
struct Carry {
    nationality: Option<String>,
    wallet_address: Option<String>,
}

/// `0x` followed by 40 hex digits.
pub fn is_wallet_address(raw: &str) -> bool {
    raw.strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn validate_phone(country_code: &str, phone: &str) -> GullinResult<()> {
    let prefix_ok = country_code
        .strip_prefix('+')
        .is_some_and(|digits| (1..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()));
    if !prefix_ok {
        return Err(GullinError::validation("country code must look like +1"));
    }
    if !(4..=15).contains(&phone.len()) || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(GullinError::validation("phone number must contain digits only"));
    }
    Ok(())
}

fn validate_address(address: &Address) -> GullinResult<()> {
    let required = [
        ("address1", &address.address1),
        ("city", &address.city),
        ("state", &address.state),
        ("zipcode", &address.zipcode),
        ("country", &address.country),
    ];
    match required.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((field, _)) => Err(GullinError::validation(format!("{field} is required"))),
        None => Ok(()),
    }
}

fn validate_documents(documents: &IdentityDocuments) -> GullinResult<()> {
    if documents.front.trim().is_empty() {
        return Err(GullinError::validation("the front of the document is required"));
    }
    if documents.nationality.trim().is_empty() {
        return Err(GullinError::validation("document nationality is required"));
    }
    Ok(())
}

/// Level-gated investor operations.
pub struct VerificationService<S: Store, N: NotificationGateway, P: IdentityProvider> {
    store: S,
    notifier: N,
    provider: P,
    auth: AuthConfig,
    config: KycConfig,
}

impl<S, N, P> VerificationService<S, N, P>
where
    S: Store,
    N: NotificationGateway,
    P: IdentityProvider,
{
    pub fn new(store: S, notifier: N, provider: P, auth: AuthConfig, config: KycConfig) -> Self {
        Self {
            store,
            notifier,
            provider,
            auth,
            config,
        }
    }

    fn codes(&self) -> VerificationCodeIssuer<'_, S::Codes> {
        VerificationCodeIssuer::new(self.store.codes(), &self.auth)
    }

    fn coordinator(&self) -> IdentityVerificationCoordinator<'_, S::Identities, P> {
        IdentityVerificationCoordinator::new(self.store.identities(), &self.provider)
    }

    async fn investor(&self, account_id: Uuid) -> GullinResult<(Account, InvestorProfile)> {
        let account = match self.store.accounts().get_by_id(account_id).await {
            Ok(account) => account,
            Err(GullinError::NotFound { .. }) => return Err(GullinError::AccountNotFound),
            Err(e) => return Err(e),
        };
        match self.store.profiles().get_by_account(account_id).await {
            Ok(profile) => Ok((account, profile)),
            Err(GullinError::NotFound { .. }) => {
                Err(GullinError::not_eligible("account has no investor profile"))
            }
            Err(e) => Err(e),
        }
    }

    async fn owner(&self, profile_id: Uuid) -> GullinResult<(Account, InvestorProfile)> {
        let profile = self.store.profiles().get_by_id(profile_id).await?;
        let account = self.store.accounts().get_by_id(profile.account_id).await?;
        Ok((account, profile))
    }

    /// Apply `event` with compare-and-set on the level. `guard` is
    /// re-checked against the fresh profile on every attempt.
    async fn apply<F>(
        &self,
        mut profile: InvestorProfile,
        event: LevelEvent,
        carry: Carry,
        guard: F,
    ) -> GullinResult<InvestorProfile>
    where
        F: Fn(&InvestorProfile) -> GullinResult<()>,
    {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            guard(&profile)?;
            let from = profile.verification_level;
            let to = levels::next_level(from, event)?;
            if to == from && carry.nationality.is_none() && carry.wallet_address.is_none() {
                return Ok(profile);
            }

            let transition = LevelTransition {
                from,
                to,
                nationality: carry.nationality.clone(),
                wallet_address: carry.wallet_address.clone(),
            };
            match self
                .store
                .profiles()
                .transition_level(profile.id, transition)
                .await?
            {
                Some(updated) => {
                    info!(
                        profile_id = %updated.id,
                        event = ?event,
                        from = %from,
                        to = %to,
                        "Verification level changed"
                    );
                    return Ok(updated);
                }
                None => {
                    debug!(profile_id = %profile.id, event = ?event, "Level moved concurrently, retrying");
                    profile = self.store.profiles().get_by_id(profile.id).await?;
                }
            }
        }
        Err(GullinError::Internal(format!(
            "verification level of profile {} kept changing",
            profile.id
        )))
    }

    async fn notify(&self, account: &Account, profile: &InvestorProfile, subject: &str, template: &str) {
        let message = EmailMessage::to(
            account.email.clone(),
            subject,
            template,
            json!({
                "user_full_name": profile.full_name(),
                "user_email": account.email,
            }),
        );
        dispatch::send_email(&self.notifier, message).await;
    }

    // -----------------------------------------------------------------
    // Email and phone
    // -----------------------------------------------------------------

    /// Consume the account's code and mark the email verified.
    pub async fn verify_email(&self, account_id: Uuid, code: &str) -> GullinResult<InvestorProfile> {
        let (_, profile) = self.investor(account_id).await?;
        self.codes().consume(account_id, code).await?;
        self.apply(profile, LevelEvent::EmailVerified, Carry::default(), |_| Ok(()))
            .await
    }

    /// Store the phone number and text a fresh code to it.
    ///
    /// `nationality` is taken from the phone's country and only written
    /// while the identity is not yet verified.
    pub async fn start_phone_verification(
        &self,
        account_id: Uuid,
        country_code: &str,
        phone: &str,
        nationality: Option<&str>,
    ) -> GullinResult<()> {
        let country_code = country_code.trim();
        let phone = phone.trim();
        validate_phone(country_code, phone)?;
        let (_, profile) = self.investor(account_id).await?;

        let account = match self
            .store
            .accounts()
            .set_phone(account_id, country_code, phone)
            .await
        {
            Ok(account) => account,
            Err(GullinError::AlreadyExists { .. }) => return Err(GullinError::DuplicatePhone),
            Err(e) => return Err(e),
        };

        if let Some(nationality) = nationality.map(str::trim).filter(|n| !n.is_empty()) {
            if profile.verification_level < VerificationLevel::IdVerified {
                self.store
                    .profiles()
                    .update(
                        profile.id,
                        UpdateInvestorProfile {
                            nationality: Some(nationality.to_string()),
                            ..Default::default()
                        },
                    )
                    .await?;
            }
        }

        let codes = self.codes();
        let code = codes.refresh(account_id).await?;
        dispatch::deliver_code(
            &self.notifier,
            &account,
            &profile.full_name(),
            &code,
            CodeChannel::Sms,
            codes.lifetime_minutes(),
        )
        .await;
        info!(account_id = %account_id, "Phone verification code sent");
        Ok(())
    }

    pub async fn verify_phone(&self, account_id: Uuid, code: &str) -> GullinResult<InvestorProfile> {
        let (account, profile) = self.investor(account_id).await?;
        if account.phone_e164().is_none() {
            return Err(GullinError::validation("no phone number on file"));
        }
        self.codes().consume(account_id, code).await?;
        self.apply(profile, LevelEvent::PhoneVerified, Carry::default(), |_| Ok(()))
            .await
    }

    // -----------------------------------------------------------------
    // Wallet
    // -----------------------------------------------------------------

    pub async fn link_wallet(&self, account_id: Uuid, address: &str) -> GullinResult<InvestorProfile> {
        let address = address.trim();
        if !is_wallet_address(address) {
            return Err(GullinError::validation(
                "wallet address must be 0x followed by 40 hex digits",
            ));
        }
        let (_, profile) = self.investor(account_id).await?;
        let carry = Carry {
            wallet_address: Some(address.to_string()),
            ..Default::default()
        };
        self.apply(profile, LevelEvent::WalletLinked, carry, |p| {
            if p.wallet_address.is_some() && p.verification_level >= VerificationLevel::WalletLinked {
                Err(GullinError::AlreadyLinked)
            } else {
                Ok(())
            }
        })
        .await
    }

    // -----------------------------------------------------------------
    // Profile maintenance
    // -----------------------------------------------------------------

    /// Name, birthday and nationality. Locked once identity verification
    /// has started.
    pub async fn update_personal_details(
        &self,
        account_id: Uuid,
        details: UpdateInvestorProfile,
    ) -> GullinResult<InvestorProfile> {
        let (_, profile) = self.investor(account_id).await?;
        if profile.verification_level > VerificationLevel::WalletLinked {
            return Err(GullinError::not_eligible(
                "personal details cannot change once identity verification has started",
            ));
        }
        self.store.profiles().update(profile.id, details).await
    }

    pub async fn update_address(
        &self,
        account_id: Uuid,
        address: Address,
    ) -> GullinResult<InvestorProfile> {
        validate_address(&address)?;
        let (_, profile) = self.investor(account_id).await?;
        self.store.profiles().set_address(profile.id, address).await
    }

    // -----------------------------------------------------------------
    // Identity verification
    // -----------------------------------------------------------------

    /// Submit identity documents to the provider.
    ///
    /// The profile moves to `IDProcessing` and the record is saved before
    /// the provider is called. A provider verdict of `A` or `D` is
    /// applied immediately; `R` leaves the profile in `IDProcessing`.
    /// A provider failure returns `ProviderUnavailable` and leaves the
    /// submission pending for a retry.
    pub async fn submit_identity_documents(
        &self,
        account_id: Uuid,
        documents: IdentityDocuments,
    ) -> GullinResult<SubmissionReceipt> {
        validate_documents(&documents)?;
        let (account, profile) = self.investor(account_id).await?;
        levels::next_level(profile.verification_level, LevelEvent::IdentitySubmitted)?;
        let payload = coordinator::build_payload(&account, &profile)?;

        let profile = self
            .apply(profile, LevelEvent::IdentitySubmitted, Carry::default(), |_| Ok(()))
            .await?;

        let mut receipt = self
            .coordinator()
            .submit_payload(&profile, documents, &payload)
            .await?;

        self.notify(
            &account,
            &profile,
            "Gullin - ID Verification Request Received",
            templates::KYC_PROCESSING,
        )
        .await;

        receipt.level = match receipt.provider_state {
            IdentityState::Accepted => {
                let verdict = self.settle_accepted(&account, profile, receipt.record.clone()).await?;
                receipt.record = verdict.record;
                verdict.profile.verification_level
            }
            IdentityState::Rejected => {
                let verdict = self.settle_rejected(&account, profile).await?;
                receipt.record = verdict.record;
                verdict.profile.verification_level
            }
            IdentityState::UnderReview | IdentityState::Pending => profile.verification_level,
        };
        Ok(receipt)
    }

    /// Accept the profile's identity verification. Nationality is taken
    /// from the verified document.
    pub async fn accept_identity(&self, profile_id: Uuid) -> GullinResult<IdentityVerdict> {
        let (account, profile) = self.owner(profile_id).await?;
        let record = self.undecided_record(profile_id).await?;
        self.settle_accepted(&account, profile, record).await
    }

    /// Reject the profile's identity verification and roll the level back
    /// to `PhoneVerified`. The investor may submit again.
    pub async fn reject_identity(&self, profile_id: Uuid) -> GullinResult<IdentityVerdict> {
        let (account, profile) = self.owner(profile_id).await?;
        self.undecided_record(profile_id).await?;
        self.settle_rejected(&account, profile).await
    }

    /// The profile's record, provided no verdict has been reached on it.
    async fn undecided_record(&self, profile_id: Uuid) -> GullinResult<IdentityVerificationRecord> {
        let record = self.coordinator().record_for(profile_id).await?;
        match record.state {
            IdentityState::Pending | IdentityState::UnderReview => Ok(record),
            IdentityState::Accepted | IdentityState::Rejected => Err(GullinError::not_eligible(
                "identity verification has already been decided",
            )),
        }
    }

    async fn settle_accepted(
        &self,
        account: &Account,
        profile: InvestorProfile,
        record: IdentityVerificationRecord,
    ) -> GullinResult<IdentityVerdict> {
        let carry = Carry {
            nationality: Some(record.documents.nationality.clone()),
            ..Default::default()
        };
        let profile = self
            .apply(profile, LevelEvent::IdentityAccepted, carry, |_| Ok(()))
            .await?;
        let record = self
            .store
            .identities()
            .set_verdict(profile.id, IdentityState::Accepted, "Identity accepted".into())
            .await?;

        self.notify(
            account,
            &profile,
            "Gullin - ID Verification Approved",
            templates::KYC_SUCCESS,
        )
        .await;

        let accredited_eligible = profile.verification_level == VerificationLevel::IdVerified
            && profile.is_us_national();
        Ok(IdentityVerdict {
            profile,
            record,
            accredited_eligible,
        })
    }

    async fn settle_rejected(
        &self,
        account: &Account,
        profile: InvestorProfile,
    ) -> GullinResult<IdentityVerdict> {
        let profile = self
            .apply(profile, LevelEvent::IdentityRejected, Carry::default(), |_| Ok(()))
            .await?;
        let record = self
            .store
            .identities()
            .set_verdict(profile.id, IdentityState::Rejected, "Identity rejected".into())
            .await?;

        self.notify(
            account,
            &profile,
            "Gullin - ID Verification Rejected",
            templates::KYC_FAILED,
        )
        .await;

        Ok(IdentityVerdict {
            profile,
            record,
            accredited_eligible: false,
        })
    }

    // -----------------------------------------------------------------
    // Accredited investor
    // -----------------------------------------------------------------

    /// Only US nationals at `IDVerified` may request accredited investor
    /// verification. Notifies the review team and the investor.
    pub async fn request_accredited_verification(
        &self,
        account_id: Uuid,
    ) -> GullinResult<InvestorProfile> {
        let (account, profile) = self.investor(account_id).await?;
        let profile = self
            .apply(profile, LevelEvent::AccreditedRequested, Carry::default(), |p| {
                if p.is_us_national() {
                    Ok(())
                } else {
                    Err(GullinError::not_eligible(
                        "accredited investor verification is only available to United States nationals",
                    ))
                }
            })
            .await?;

        let team = EmailMessage::to(
            self.config.team_email.clone(),
            "A user requested accredited investor verification.",
            templates::TEAM_NOTIFICATION,
            json!({
                "title": "A user requested accredited investor verification",
                "content": format!(
                    "Investor profile {} ({}) is waiting for accredited investor review.",
                    profile.id, account.email
                ),
            }),
        );
        dispatch::send_email(&self.notifier, team).await;
        self.notify(
            &account,
            &profile,
            "Gullin - ID Verification Request Received",
            templates::AIV_PROCESSING,
        )
        .await;
        Ok(profile)
    }

    pub async fn accept_accredited(&self, profile_id: Uuid) -> GullinResult<InvestorProfile> {
        let (account, profile) = self.owner(profile_id).await?;
        let profile = self
            .apply(profile, LevelEvent::AccreditedAccepted, Carry::default(), |_| Ok(()))
            .await?;
        self.notify(
            &account,
            &profile,
            "Gullin - Accredited Investor Verification Approved",
            templates::AIV_SUCCESS,
        )
        .await;
        Ok(profile)
    }

    /// Roll back to `IDVerified`.
    pub async fn reject_accredited(&self, profile_id: Uuid) -> GullinResult<InvestorProfile> {
        let (account, profile) = self.owner(profile_id).await?;
        let profile = self
            .apply(profile, LevelEvent::AccreditedRejected, Carry::default(), |_| Ok(()))
            .await?;
        self.notify(
            &account,
            &profile,
            "Gullin - Accredited Investor Verification Rejected",
            templates::AIV_FAILED,
        )
        .await;
        Ok(profile)
    }
}
