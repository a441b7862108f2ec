//! Notification gateway that writes outgoing messages to the log.
//!
//! Stands in until an email/SMS transport is attached. Message bodies
//! carry codes, so only the envelope is logged.

use gullin_core::notification::{EmailMessage, NotificationError, NotificationGateway};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingGateway;

/// Keep the last four digits of a phone number.
pub fn mask_phone(phone_e164: &str) -> String {
    let visible = phone_e164.len().saturating_sub(4);
    phone_e164
        .char_indices()
        .map(|(i, c)| if i < visible && c.is_ascii_digit() { '*' } else { c })
        .collect()
}

impl NotificationGateway for TracingGateway {
    async fn send_email(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(
            recipients = message.recipients.len(),
            subject = %message.subject,
            template = %message.template,
            "Email queued"
        );
        Ok(())
    }

    async fn send_sms(&self, phone_e164: &str, message: &str) -> Result<(), NotificationError> {
        info!(
            phone = %mask_phone(phone_e164),
            length = message.len(),
            "SMS queued"
        );
        Ok(())
    }
}
