//! Authentication service: sign-up, login with a new-IP second factor,
//! token refresh, password change and reset.
//!
//! A login from the account's last known IP succeeds directly. Any other
//! IP parks a pre-issued token in the [`SessionChallengeStore`] and
//! releases it only after the second factor is confirmed.

use chrono::{Duration, Utc};
use gullin_core::challenge::{PendingLogin, PendingReset, SessionChallengeStore, SessionHandle};
use gullin_core::error::{GullinError, GullinResult};
use gullin_core::models::account::{
    Account, AccountRole, AnalystProfile, CompanyProfile, CreateAccount, PrimaryRole,
    UpdateAccount,
};
use gullin_core::models::activity::{self, ActivityLogEntry, CreateActivityLogEntry};
use gullin_core::models::investor::{CreateInvestorProfile, InvestorProfile};
use gullin_core::notification::{EmailMessage, NotificationGateway, templates};
use gullin_core::repository::{
    AccountRepository, ActivityLogRepository, InvestorProfileRepository, PaginatedResult,
    Pagination, Store,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::code::VerificationCodeIssuer;
use crate::config::AuthConfig;
use crate::dispatch::{self, CodeChannel};
use crate::error::AuthError;
use crate::geo::{self, GeoLocator};
use crate::password;
use crate::token;
use crate::totp::{self, TotpEnrollment};

/// Where a request came from.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip: String,
    /// Client user agent, recorded as the device in the activity log.
    pub user_agent: Option<String>,
}

impl ClientContext {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub account: Account,
    pub profile: InvestorProfile,
    pub token: String,
}

/// How the pending second factor is to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactor {
    /// A code was sent over this channel.
    Code(CodeChannel),
    /// The account's authenticator app.
    Authenticator,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials accepted from the last known IP.
    DirectSuccess { account_id: Uuid, token: String },
    /// Credentials accepted from a new IP; complete with the handle.
    SecondFactorPending {
        handle: SessionHandle,
        factor: SecondFactor,
    },
    /// Second factor confirmed; the token issued at login is released.
    Authenticated { account_id: Uuid, token: String },
}

impl LoginOutcome {
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::DirectSuccess { token, .. } | Self::Authenticated { token, .. } => Some(token),
            Self::SecondFactorPending { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResetStarted {
    pub handle: SessionHandle,
    pub channel: CodeChannel,
}

/// Lower-cases the domain of a plausible email address.
pub fn normalize_email(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let (local, domain) = raw.rsplit_once('@')?;
    let plausible = !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !raw.chars().any(char::is_whitespace);
    plausible.then(|| format!("{local}@{}", domain.to_lowercase()))
}

/// Authentication service.
///
/// Generic over the store and collaborators so that the auth layer has
/// no dependency on the database crate or on any delivery transport.
pub struct AuthService<S: Store, C: SessionChallengeStore, N: NotificationGateway, G: GeoLocator> {
    store: S,
    challenges: C,
    notifier: N,
    geo: G,
    config: AuthConfig,
}

impl<S, C, N, G> AuthService<S, C, N, G>
where
    S: Store,
    C: SessionChallengeStore,
    N: NotificationGateway,
    G: GeoLocator,
{
    pub fn new(store: S, challenges: C, notifier: N, geo: G, config: AuthConfig) -> Self {
        Self {
            store,
            challenges,
            notifier,
            geo,
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn challenges(&self) -> &C {
        &self.challenges
    }

    fn codes(&self) -> VerificationCodeIssuer<'_, S::Codes> {
        VerificationCodeIssuer::new(self.store.codes(), &self.config)
    }

    fn new_handle() -> SessionHandle {
        SessionHandle::new(token::generate_session_handle())
    }

    fn challenge_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::seconds(self.config.challenge_lifetime_secs as i64)
    }

    fn check_password_policy(&self, password: &str) -> GullinResult<()> {
        if password.chars().count() < self.config.min_password_length {
            return Err(GullinError::validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }
        Ok(())
    }

    async fn log(
        &self,
        account_id: Uuid,
        action: &str,
        ctx: &ClientContext,
    ) -> GullinResult<ActivityLogEntry> {
        self.store
            .activity()
            .append(CreateActivityLogEntry {
                account_id,
                action: action.to_string(),
                ip: Some(ctx.ip.clone()),
                device: ctx.user_agent.clone(),
            })
            .await
    }

    /// Name used to greet the account owner in emails.
    async fn display_name(&self, account: &Account) -> GullinResult<String> {
        if !account.is_investor {
            return Ok(account.email.clone());
        }
        match self.store.profiles().get_by_account(account.id).await {
            Ok(profile) => Ok(profile.full_name()),
            Err(GullinError::NotFound { .. }) => Ok(account.email.clone()),
            Err(e) => Err(e),
        }
    }

    /// Look up by email first, then by phone (E.164 or a national number
    /// held by exactly one account).
    async fn find_by_identifier(&self, identifier: &str) -> GullinResult<Account> {
        let identifier = identifier.trim();
        let email = normalize_email(identifier).unwrap_or_else(|| identifier.to_string());
        match self.store.accounts().get_by_email(&email).await {
            Ok(account) => return Ok(account),
            Err(GullinError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
        match self.store.accounts().get_by_phone(identifier).await {
            Ok(account) => Ok(account),
            Err(GullinError::NotFound { .. }) => Err(GullinError::AccountNotFound),
            Err(e) => Err(e),
        }
    }

    async fn issue_and_send_code(
        &self,
        account: &Account,
        channel: CodeChannel,
    ) -> GullinResult<()> {
        let issuer = self.codes();
        let code = issuer.refresh(account.id).await?;
        let name = self.display_name(account).await?;
        dispatch::deliver_code(
            &self.notifier,
            account,
            &name,
            &code,
            channel,
            issuer.lifetime_minutes(),
        )
        .await;
        Ok(())
    }

    async fn record_login(&self, account_id: Uuid, ctx: &ClientContext) -> GullinResult<Account> {
        self.store
            .accounts()
            .update(
                account_id,
                UpdateAccount {
                    last_login_at: Some(Utc::now()),
                    last_login_ip: Some(ctx.ip.clone()),
                    ..Default::default()
                },
            )
            .await
    }

    // -----------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------

    /// Register an investor account, its verification code and profile
    /// together, then send the welcome email with a fresh code.
    pub async fn sign_up(&self, input: SignUp, ctx: &ClientContext) -> GullinResult<SignUpOutcome> {
        let email = normalize_email(&input.email)
            .ok_or_else(|| GullinError::validation("Enter a valid email address."))?;
        self.check_password_policy(&input.password)?;

        let duplicate = || GullinError::validation("A user with that email already exists.");
        match self.store.accounts().get_by_email(&email).await {
            Ok(_) => return Err(duplicate()),
            Err(GullinError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let password_hash = password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let account = self
            .store
            .accounts()
            .create(CreateAccount {
                email,
                password_hash,
                last_login_ip: Some(ctx.ip.clone()),
                is_investor: true,
                is_company: false,
                is_analyst: false,
                investor: Some(CreateInvestorProfile {
                    first_name: input.first_name,
                    last_name: input.last_name,
                }),
            })
            .await
            .map_err(|e| match e {
                GullinError::AlreadyExists { .. } => duplicate(),
                other => other,
            })?;
        let profile = self.store.profiles().get_by_account(account.id).await?;
        info!(account_id = %account.id, "Account registered");

        let code = self.codes().refresh(account.id).await?;
        dispatch::send_email(
            &self.notifier,
            EmailMessage::to(
                account.email.clone(),
                "Gullin - Welcome! Please Verify Your Email",
                templates::WELCOME_AND_EMAIL_VERIFICATION,
                json!({
                    "user_full_name": profile.full_name(),
                    "verification_code": code.code,
                    "user_email": account.email,
                }),
            ),
        )
        .await;

        let token = token::issue_access_token(account.id, &self.config)?;
        Ok(SignUpOutcome {
            account,
            profile,
            token,
        })
    }

    /// Resolve the profile that drives this account's behaviour.
    pub async fn resolve_role(&self, account_id: Uuid) -> GullinResult<AccountRole> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        match account.primary_role() {
            Some(PrimaryRole::Investor) => Ok(AccountRole::Investor(
                self.store.profiles().get_by_account(account_id).await?,
            )),
            Some(PrimaryRole::CompanyUser) => {
                Ok(AccountRole::CompanyUser(CompanyProfile { account_id }))
            }
            Some(PrimaryRole::Analyst) => Ok(AccountRole::Analyst(AnalystProfile { account_id })),
            None => Err(GullinError::not_eligible("account has no role")),
        }
    }

    // -----------------------------------------------------------------
    // Login
    // -----------------------------------------------------------------

    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
        ctx: &ClientContext,
    ) -> GullinResult<LoginOutcome> {
        let account = match self.find_by_identifier(identifier).await {
            Ok(account) => account,
            Err(GullinError::AccountNotFound) => return Err(GullinError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        let valid =
            password::verify_password(password, &account.password_hash, self.config.pepper.as_deref())?;
        if !valid {
            info!(account_id = %account.id, ip = %ctx.ip, "Login rejected");
            return Err(GullinError::InvalidCredentials);
        }
        if !account.is_active {
            return Err(GullinError::AccountInactive);
        }

        let token = token::issue_access_token(account.id, &self.config)?;

        if account.last_login_ip.as_deref() == Some(ctx.ip.as_str()) {
            self.record_login(account.id, ctx).await?;
            self.log(account.id, activity::LOGIN_SUCCESSFUL, ctx).await?;
            info!(account_id = %account.id, ip = %ctx.ip, "Login from known IP");
            return Ok(LoginOutcome::DirectSuccess {
                account_id: account.id,
                token,
            });
        }

        let handle = Self::new_handle();
        self.challenges
            .put_login(
                &handle,
                PendingLogin {
                    account_id: account.id,
                    token,
                    expires_at: self.challenge_expiry(),
                },
            )
            .await?;

        let factor = if account.totp_enabled {
            SecondFactor::Authenticator
        } else {
            let channel = CodeChannel::preferred_for(&account);
            self.issue_and_send_code(&account, channel).await?;
            SecondFactor::Code(channel)
        };

        self.log(account.id, activity::LOGIN_NEEDS_SECOND_FACTOR, ctx)
            .await?;
        info!(account_id = %account.id, ip = %ctx.ip, "Login from new IP, second factor required");

        let location = geo::describe(&self.geo, &ctx.ip).await;
        let name = self.display_name(&account).await?;
        dispatch::send_email(
            &self.notifier,
            EmailMessage::to(
                account.email.clone(),
                "Gullin - Login from a different IP",
                templates::DIFFERENT_IP_LOGIN_NOTICE,
                json!({
                    "user_full_name": name,
                    "user_email": account.email,
                    "user_ip": ctx.ip,
                    "user_location": location,
                    "user_device": ctx.user_agent,
                }),
            ),
        )
        .await;

        Ok(LoginOutcome::SecondFactorPending { handle, factor })
    }

    /// Confirm the second factor for the login parked under `handle`.
    pub async fn complete_second_factor(
        &self,
        handle: &SessionHandle,
        submitted: &str,
        ctx: &ClientContext,
    ) -> GullinResult<LoginOutcome> {
        let pending = self
            .challenges
            .get_login(handle)
            .await?
            .ok_or(GullinError::NoPendingChallenge)?;
        let account = self.store.accounts().get_by_id(pending.account_id).await?;

        if account.totp_enabled {
            self.check_totp(&account, submitted)?;
        } else {
            self.codes().consume(account.id, submitted).await?;
        }

        // Only one caller gets the parked token.
        let pending = self
            .challenges
            .take_login(handle)
            .await?
            .ok_or(GullinError::NoPendingChallenge)?;

        self.record_login(account.id, ctx).await?;
        self.log(account.id, activity::SECOND_FACTOR_SUCCESSFUL, ctx)
            .await?;
        info!(account_id = %account.id, ip = %ctx.ip, "Second factor confirmed");

        Ok(LoginOutcome::Authenticated {
            account_id: account.id,
            token: pending.token,
        })
    }

    /// Drop every challenge bound to the handle.
    pub async fn logout(&self, handle: &SessionHandle) -> GullinResult<()> {
        self.challenges.clear(handle).await
    }

    // -----------------------------------------------------------------
    // Bearer tokens
    // -----------------------------------------------------------------

    /// Validate a bearer token and return its active account.
    pub async fn validate_token(&self, token: &str) -> GullinResult<Account> {
        let claims = token::decode_access_token(token, &self.config)?;
        let account = match self.store.accounts().get_by_id(claims.account_id()?).await {
            Ok(account) => account,
            Err(GullinError::NotFound { .. }) => {
                return Err(GullinError::InvalidToken("unknown account".into()));
            }
            Err(e) => return Err(e),
        };
        if !account.is_active {
            return Err(GullinError::AccountInactive);
        }
        Ok(account)
    }

    /// Reissue a still-valid token without re-checking the password.
    pub async fn refresh_token(&self, token: &str) -> GullinResult<String> {
        let claims = token::decode_access_token(token, &self.config)?;
        self.validate_token(token).await?;
        Ok(token::reissue_access_token(&claims, &self.config)?)
    }

    // -----------------------------------------------------------------
    // Passwords
    // -----------------------------------------------------------------

    /// Every attempt lands in the activity log, successful or not.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current: &str,
        new_password: &str,
        ctx: &ClientContext,
    ) -> GullinResult<()> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        let pepper = self.config.pepper.as_deref();

        if !password::verify_password(current, &account.password_hash, pepper)? {
            self.log(account_id, activity::PASSWORD_CHANGE_FAILED, ctx)
                .await?;
            return Err(GullinError::CurrentPasswordMismatch);
        }
        if let Err(e) = self.check_password_policy(new_password) {
            self.log(account_id, activity::PASSWORD_CHANGE_FAILED, ctx)
                .await?;
            return Err(e);
        }

        self.store
            .accounts()
            .update(
                account_id,
                UpdateAccount {
                    password_hash: Some(password::hash_password(new_password, pepper)?),
                    ..Default::default()
                },
            )
            .await?;
        self.log(account_id, activity::PASSWORD_CHANGED, ctx).await?;
        info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    pub async fn initiate_password_reset(
        &self,
        identifier: &str,
        ctx: &ClientContext,
    ) -> GullinResult<ResetStarted> {
        let account = self.find_by_identifier(identifier).await?;
        let channel = CodeChannel::preferred_for(&account);

        let handle = Self::new_handle();
        self.challenges
            .put_reset(
                &handle,
                PendingReset {
                    account_id: account.id,
                    eligible: false,
                    expires_at: self.challenge_expiry(),
                },
            )
            .await?;
        self.log(account.id, activity::FORGOT_PASSWORD_REQUEST, ctx)
            .await?;
        self.issue_and_send_code(&account, channel).await?;

        info!(account_id = %account.id, "Password reset requested");
        Ok(ResetStarted { handle, channel })
    }

    pub async fn confirm_reset_code(
        &self,
        handle: &SessionHandle,
        submitted: &str,
    ) -> GullinResult<()> {
        let reset = self
            .challenges
            .get_reset(handle)
            .await?
            .ok_or(GullinError::NoPendingChallenge)?;

        self.codes().consume(reset.account_id, submitted).await?;

        if !self.challenges.mark_reset_eligible(handle).await? {
            return Err(GullinError::NoPendingChallenge);
        }
        Ok(())
    }

    pub async fn set_new_password(
        &self,
        handle: &SessionHandle,
        new_password: &str,
        ctx: &ClientContext,
    ) -> GullinResult<()> {
        let not_eligible = || GullinError::not_eligible("reset code has not been confirmed");

        let eligible = self
            .challenges
            .get_reset(handle)
            .await?
            .is_some_and(|r| r.eligible);
        if !eligible {
            return Err(not_eligible());
        }
        self.check_password_policy(new_password)?;

        let reset = self
            .challenges
            .take_eligible_reset(handle)
            .await?
            .ok_or_else(not_eligible)?;

        self.store
            .accounts()
            .update(
                reset.account_id,
                UpdateAccount {
                    password_hash: Some(password::hash_password(
                        new_password,
                        self.config.pepper.as_deref(),
                    )?),
                    ..Default::default()
                },
            )
            .await?;
        self.challenges.clear(handle).await?;
        self.log(reset.account_id, activity::PASSWORD_CHANGED, ctx)
            .await?;
        info!(account_id = %reset.account_id, "Password reset completed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Codes, TOTP, activity
    // -----------------------------------------------------------------

    /// Issue a fresh code and send it over `channel`.
    pub async fn send_verification_code(
        &self,
        account_id: Uuid,
        channel: CodeChannel,
    ) -> GullinResult<()> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        if channel == CodeChannel::Sms && account.phone_e164().is_none() {
            return Err(GullinError::validation("no phone number on file"));
        }
        self.issue_and_send_code(&account, channel).await
    }

    fn totp_key(&self) -> Result<&[u8; 32], AuthError> {
        self.config
            .totp_encryption_key
            .as_ref()
            .ok_or(AuthError::TotpUnavailable)
    }

    fn check_totp(&self, account: &Account, submitted: &str) -> GullinResult<()> {
        let secret = account
            .totp_secret
            .as_deref()
            .ok_or_else(|| GullinError::not_eligible("authenticator is not enrolled"))?;
        let ok = totp::verify(
            self.totp_key()?,
            secret,
            submitted,
            &self.config.totp_issuer,
            &account.email,
        )?;
        if ok {
            Ok(())
        } else {
            Err(GullinError::CodeMismatch)
        }
    }

    /// Store a new authenticator secret. It is not used for login until
    /// [`confirm_totp`](Self::confirm_totp) succeeds.
    pub async fn enroll_totp(&self, account_id: Uuid) -> GullinResult<TotpEnrollment> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        let enrollment = totp::enroll(self.totp_key()?, &self.config.totp_issuer, &account.email)?;

        self.store
            .accounts()
            .update(
                account_id,
                UpdateAccount {
                    totp_enabled: Some(false),
                    totp_secret: Some(Some(enrollment.encrypted_secret.clone())),
                    ..Default::default()
                },
            )
            .await?;
        Ok(enrollment)
    }

    pub async fn confirm_totp(&self, account_id: Uuid, code: &str) -> GullinResult<()> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        self.check_totp(&account, code)?;

        self.store
            .accounts()
            .update(
                account_id,
                UpdateAccount {
                    totp_enabled: Some(true),
                    ..Default::default()
                },
            )
            .await?;
        info!(account_id = %account_id, "Authenticator enabled");
        Ok(())
    }

    /// Newest-first page of the account's activity log.
    pub async fn activity_log(
        &self,
        account_id: Uuid,
        page: u64,
    ) -> GullinResult<PaginatedResult<ActivityLogEntry>> {
        self.store
            .activity()
            .list_for_account(account_id, Pagination::page(page))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_domain_is_lowercased() {
        assert_eq!(
            normalize_email("  Ada@Example.COM ").as_deref(),
            Some("Ada@example.com")
        );
    }

    #[test]
    fn implausible_emails_are_rejected() {
        for raw in ["", "ada", "@example.com", "ada@", "ada@example", "a da@x.com", "ada@.com"] {
            assert!(normalize_email(raw).is_none(), "{raw:?} accepted");
        }
    }

    #[test]
    fn outcome_exposes_token_only_when_authenticated() {
        let pending = LoginOutcome::SecondFactorPending {
            handle: SessionHandle::new("h"),
            factor: SecondFactor::Authenticator,
        };
        assert!(pending.token().is_none());

        let done = LoginOutcome::Authenticated {
            account_id: Uuid::new_v4(),
            token: "t".into(),
        };
        assert_eq!(done.token(), Some("t"));
    }
}
