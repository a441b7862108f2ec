//! In-process [`SessionChallengeStore`].
//!
//! Entries are keyed by the SHA-256 of the session handle and dropped
//! lazily once expired. No lock is held across an await point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use gullin_core::challenge::{PendingLogin, PendingReset, SessionChallengeStore, SessionHandle};
use gullin_core::error::{GullinError, GullinResult};

use crate::token::hash_session_handle;

#[derive(Debug, Default)]
struct Slots {
    login: Option<PendingLogin>,
    reset: Option<PendingReset>,
}

impl Slots {
    fn prune(&mut self) {
        let now = Utc::now();
        if self.login.as_ref().is_some_and(|l| l.expires_at <= now) {
            self.login = None;
        }
        if self.reset.as_ref().is_some_and(|r| r.expires_at <= now) {
            self.reset = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.login.is_none() && self.reset.is_none()
    }
}

#[derive(Debug, Default)]
pub struct MemoryChallengeStore {
    sessions: Mutex<HashMap<String, Slots>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> GullinResult<MutexGuard<'_, HashMap<String, Slots>>> {
        self.sessions
            .lock()
            .map_err(|_| GullinError::Internal("challenge store lock poisoned".into()))
    }

    /// Run `f` on the live slots of `handle`, removing the entry when it
    /// ends up empty.
    fn with_slots<T>(
        &self,
        handle: &SessionHandle,
        f: impl FnOnce(&mut Slots) -> T,
    ) -> GullinResult<T> {
        let key = hash_session_handle(handle.as_str());
        let mut sessions = self.lock()?;
        let slots = sessions.entry(key.clone()).or_default();
        slots.prune();
        let out = f(slots);
        if slots.is_empty() {
            sessions.remove(&key);
        }
        Ok(out)
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) -> GullinResult<usize> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, slots| {
            slots.prune();
            !slots.is_empty()
        });
        Ok(before - sessions.len())
    }

    pub fn len(&self) -> GullinResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> GullinResult<bool> {
        Ok(self.lock()?.is_empty())
    }
}

impl SessionChallengeStore for MemoryChallengeStore {
    async fn put_login(&self, handle: &SessionHandle, login: PendingLogin) -> GullinResult<()> {
        self.with_slots(handle, |slots| slots.login = Some(login))
    }

    async fn get_login(&self, handle: &SessionHandle) -> GullinResult<Option<PendingLogin>> {
        self.with_slots(handle, |slots| slots.login.clone())
    }

    async fn take_login(&self, handle: &SessionHandle) -> GullinResult<Option<PendingLogin>> {
        self.with_slots(handle, |slots| slots.login.take())
    }

    async fn put_reset(&self, handle: &SessionHandle, reset: PendingReset) -> GullinResult<()> {
        self.with_slots(handle, |slots| slots.reset = Some(reset))
    }

    async fn get_reset(&self, handle: &SessionHandle) -> GullinResult<Option<PendingReset>> {
        self.with_slots(handle, |slots| slots.reset.clone())
    }

    async fn mark_reset_eligible(&self, handle: &SessionHandle) -> GullinResult<bool> {
        self.with_slots(handle, |slots| match slots.reset.as_mut() {
            Some(reset) => {
                reset.eligible = true;
                true
            }
            None => false,
        })
    }

    async fn take_eligible_reset(
        &self,
        handle: &SessionHandle,
    ) -> GullinResult<Option<PendingReset>> {
        self.with_slots(handle, |slots| {
            if slots.reset.as_ref().is_some_and(|r| r.eligible) {
                slots.reset.take()
            } else {
                None
            }
        })
    }

    async fn clear(&self, handle: &SessionHandle) -> GullinResult<()> {
        self.with_slots(handle, |slots| {
            slots.login = None;
            slots.reset = None;
        })
    }
}
