//! Transient server-side state for partially completed logins and
//! password resets.
//!
//! State is keyed by an opaque [`SessionHandle`] handed back to the
//! client. Each handle holds at most one pending login and one pending
//! reset. Implementations must be safe for concurrent access from
//! multiple request handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GullinResult;

/// Opaque client-held key for server-side challenge state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A login awaiting its second factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingLogin {
    pub account_id: Uuid,
    /// Bearer token issued when the credentials were accepted; released
    /// to the client only after the second factor succeeds.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A password reset in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingReset {
    pub account_id: Uuid,
    /// Set once the emailed/texted code has been confirmed.
    pub eligible: bool,
    pub expires_at: DateTime<Utc>,
}

pub trait SessionChallengeStore: Send + Sync {
    /// Store a pending login, replacing any previous one for the handle.
    fn put_login(
        &self,
        handle: &SessionHandle,
        login: PendingLogin,
    ) -> impl Future<Output = GullinResult<()>> + Send;

    /// Read the unexpired pending login without removing it.
    fn get_login(
        &self,
        handle: &SessionHandle,
    ) -> impl Future<Output = GullinResult<Option<PendingLogin>>> + Send;

    /// Remove and return the pending login. Exactly one concurrent caller
    /// receives `Some`.
    fn take_login(
        &self,
        handle: &SessionHandle,
    ) -> impl Future<Output = GullinResult<Option<PendingLogin>>> + Send;

    /// Store a pending reset, replacing any previous one for the handle.
    fn put_reset(
        &self,
        handle: &SessionHandle,
        reset: PendingReset,
    ) -> impl Future<Output = GullinResult<()>> + Send;

    fn get_reset(
        &self,
        handle: &SessionHandle,
    ) -> impl Future<Output = GullinResult<Option<PendingReset>>> + Send;

    /// Flag the pending reset as eligible for a new password. Returns
    /// `false` when there is no unexpired reset for the handle.
    fn mark_reset_eligible(
        &self,
        handle: &SessionHandle,
    ) -> impl Future<Output = GullinResult<bool>> + Send;

    /// Remove and return the pending reset only if it is eligible.
    fn take_eligible_reset(
        &self,
        handle: &SessionHandle,
    ) -> impl Future<Output = GullinResult<Option<PendingReset>>> + Send;

    /// Drop everything bound to the handle.
    fn clear(&self, handle: &SessionHandle) -> impl Future<Output = GullinResult<()>> + Send;
}
