//! Activity log domain model (append-only).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const LOGIN_SUCCESSFUL: &str = "Login Successful";
pub const LOGIN_NEEDS_SECOND_FACTOR: &str = "Login Successful (Need 2 Factor Auth)";
pub const SECOND_FACTOR_SUCCESSFUL: &str = "2 Factor Auth Successful";
pub const FORGOT_PASSWORD_REQUEST: &str = "Forgot password request";
pub const PASSWORD_CHANGED: &str = "Password changed";
pub const PASSWORD_CHANGE_FAILED: &str = "Password change failed";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub action: String,
    pub ip: Option<String>,
    /// Client user agent.
    pub device: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityLogEntry {
    pub account_id: Uuid,
    pub action: String,
    pub ip: Option<String>,
    pub device: Option<String>,
}
