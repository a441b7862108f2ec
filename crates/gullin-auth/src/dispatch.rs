//! Best-effort delivery of codes and notices through a
//! [`NotificationGateway`].
//!
//! Every helper here runs after state has been persisted. Delivery
//! failures are logged and swallowed.

use gullin_core::models::account::Account;
use gullin_core::models::verification_code::VerificationCode;
use gullin_core::notification::{EmailMessage, NotificationGateway, templates};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

/// Out-of-band channel a verification code went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeChannel {
    Email,
    Sms,
}

impl CodeChannel {
    /// SMS when a phone is on file, email otherwise.
    pub fn preferred_for(account: &Account) -> Self {
        if account.phone_e164().is_some() {
            Self::Sms
        } else {
            Self::Email
        }
    }
}

pub fn sms_text(code: &str, lifetime_minutes: i64) -> String {
    format!("Verification Code: {code}\nInvalid in {lifetime_minutes} minutes.")
}

pub async fn send_email<N: NotificationGateway>(notifier: &N, message: EmailMessage) {
    let template = message.template.clone();
    match notifier.send_email(message).await {
        Ok(()) => info!(template = %template, "Email dispatched"),
        Err(e) => warn!(template = %template, error = %e, "Email delivery failed"),
    }
}

pub async fn send_sms<N: NotificationGateway>(notifier: &N, phone_e164: &str, text: &str) {
    if let Err(e) = notifier.send_sms(phone_e164, text).await {
        warn!(error = %e, "SMS delivery failed");
    }
}

/// Deliver `code` to the account over `channel`. Falls back to email
/// when SMS is requested but no phone is on file.
pub async fn deliver_code<N: NotificationGateway>(
    notifier: &N,
    account: &Account,
    full_name: &str,
    code: &VerificationCode,
    channel: CodeChannel,
    lifetime_minutes: i64,
) {
    match (channel, account.phone_e164()) {
        (CodeChannel::Sms, Some(phone)) => {
            send_sms(notifier, &phone, &sms_text(&code.code, lifetime_minutes)).await;
        }
        _ => {
            let message = EmailMessage::to(
                account.email.clone(),
                "Gullin - Verification Code",
                templates::VERIFICATION_CODE,
                json!({
                    "user_full_name": full_name,
                    "verification_code": code.code,
                    "user_email": account.email,
                }),
            );
            send_email(notifier, message).await;
        }
    }
}
