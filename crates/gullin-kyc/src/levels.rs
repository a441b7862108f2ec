//! Verification level transitions.
//!
//! [`next_level`] is the single place that decides where a profile's
//! level may go. Forward steps never downgrade a further-along profile.
//! The only decreases are the two named rollbacks,
//! [`LevelEvent::IdentityRejected`] and [`LevelEvent::AccreditedRejected`].

use gullin_core::error::{GullinError, GullinResult};
use gullin_core::models::investor::VerificationLevel::{self, *};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelEvent {
    EmailVerified,
    PhoneVerified,
    WalletLinked,
    IdentitySubmitted,
    IdentityAccepted,
    IdentityRejected,
    AccreditedRequested,
    AccreditedAccepted,
    AccreditedRejected,
}

impl LevelEvent {
    pub const ALL: [LevelEvent; 9] = [
        Self::EmailVerified,
        Self::PhoneVerified,
        Self::WalletLinked,
        Self::IdentitySubmitted,
        Self::IdentityAccepted,
        Self::IdentityRejected,
        Self::AccreditedRequested,
        Self::AccreditedAccepted,
        Self::AccreditedRejected,
    ];

    pub fn is_rollback(self) -> bool {
        matches!(self, Self::IdentityRejected | Self::AccreditedRejected)
    }
}

/// Level after `event` is applied at `current`, or `NotEligible` when the
/// event is not permitted there.
pub fn next_level(
    current: VerificationLevel,
    event: LevelEvent,
) -> GullinResult<VerificationLevel> {
    match event {
        LevelEvent::EmailVerified => Ok(current.max(EmailVerified)),
        LevelEvent::PhoneVerified => Ok(current.max(PhoneVerified)),
        LevelEvent::WalletLinked => Ok(current.max(WalletLinked)),

        LevelEvent::IdentitySubmitted => {
            if current < PhoneVerified {
                Err(GullinError::not_eligible(
                    "phone must be verified before identity documents are submitted",
                ))
            } else if current >= IdVerified {
                Err(GullinError::not_eligible("identity is already verified"))
            } else {
                Ok(IdProcessing)
            }
        }
        LevelEvent::IdentityAccepted | LevelEvent::IdentityRejected => {
            if current != IdProcessing {
                return Err(GullinError::not_eligible(
                    "no identity verification is in progress",
                ));
            }
            Ok(if event == LevelEvent::IdentityAccepted {
                IdVerified
            } else {
                PhoneVerified
            })
        }

        LevelEvent::AccreditedRequested => {
            if current == IdVerified {
                Ok(AccreditedProcessing)
            } else {
                Err(GullinError::not_eligible(format!(
                    "accredited investor verification requires {}, profile is at {}",
                    IdVerified.label(),
                    current.label()
                )))
            }
        }
        LevelEvent::AccreditedAccepted | LevelEvent::AccreditedRejected => {
            if current != AccreditedProcessing {
                return Err(GullinError::not_eligible(
                    "no accredited investor verification is in progress",
                ));
            }
            Ok(if event == LevelEvent::AccreditedAccepted {
                AccreditedVerified
            } else {
                IdVerified
            })
        }
    }
}
