//! Gullin Auth: sign-up, login with new-IP second factor, password
//! reset, bearer tokens, verification codes and TOTP.

pub mod challenge;
pub mod code;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod password;
pub mod service;
pub mod token;
pub mod totp;

pub use challenge::MemoryChallengeStore;
pub use code::VerificationCodeIssuer;
pub use config::AuthConfig;
pub use dispatch::CodeChannel;
pub use error::AuthError;
pub use geo::{GeoLocator, NoGeoLocation};
pub use service::{
    AuthService, ClientContext, LoginOutcome, ResetStarted, SecondFactor, SignUp, SignUpOutcome,
};
pub use token::AccessTokenClaims;
