//! Gullin KYC: investor verification levels, identity verification
//! coordination and the HTTP client for the external identity provider.
//!
//! - [`levels`]: the pure verification-level transition function
//! - [`VerificationService`]: level-gated investor operations
//! - [`IdentityVerificationCoordinator`]: persist-then-submit to the provider
//! - [`HttpIdentityProvider`]: reqwest client for the provider endpoint

pub mod config;
pub mod coordinator;
pub mod error;
pub mod levels;
pub mod provider;
pub mod service;

pub use config::{ConfigError, KycConfig, ProviderConfig};
pub use coordinator::{IdentityVerificationCoordinator, SubmissionReceipt};
pub use error::ProviderError;
pub use levels::LevelEvent;
pub use provider::HttpIdentityProvider;
pub use service::{IdentityVerdict, VerificationService};
