//! Outbound email/SMS contract.
//!
//! Delivery is a best-effort side channel: callers persist state first,
//! then notify, and only log a [`NotificationError`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod templates {
    pub const WELCOME_AND_EMAIL_VERIFICATION: &str = "welcome_and_email_verification";
    pub const VERIFICATION_CODE: &str = "verification_code";
    pub const DIFFERENT_IP_LOGIN_NOTICE: &str = "different_ip_login_notice";
    pub const KYC_PROCESSING: &str = "kyc_processing";
    pub const KYC_SUCCESS: &str = "kyc_success";
    pub const KYC_FAILED: &str = "kyc_failed";
    pub const AIV_PROCESSING: &str = "aiv_processing";
    pub const AIV_SUCCESS: &str = "aiv_success";
    pub const AIV_FAILED: &str = "aiv_failed";
    pub const TEAM_NOTIFICATION: &str = "gullin_team_notification";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub recipients: Vec<String>,
    pub subject: String,
    pub template: String,
    pub context: serde_json::Value,
}

impl EmailMessage {
    pub fn to(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        template: &str,
        context: serde_json::Value,
    ) -> Self {
        Self {
            recipients: vec![recipient.into()],
            subject: subject.into(),
            template: template.to_string(),
            context,
        }
    }
}

#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationError(pub String);

pub trait NotificationGateway: Send + Sync {
    fn send_email(
        &self,
        message: EmailMessage,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;

    fn send_sms(
        &self,
        phone_e164: &str,
        message: &str,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}
