//! Process configuration, read from `GULLIN_*` environment variables.

use std::str::FromStr;

use gullin_auth::AuthConfig;
use gullin_db::DbConfig;
use gullin_kyc::{KycConfig, ProviderConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error(transparent)]
    Provider(#[from] gullin_kyc::ConfigError),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    pub provider: ProviderConfig,
    pub kyc: KycConfig,
    /// Interval between sweeps of expired login and reset challenges.
    pub challenge_sweep_secs: u64,
}

impl ServerConfig {
    /// Variables:
    /// - `GULLIN_DB_URL`, `GULLIN_DB_NAMESPACE`, `GULLIN_DB_DATABASE`,
    ///   `GULLIN_DB_USER`, `GULLIN_DB_PASSWORD`
    /// - `GULLIN_JWT_PRIVATE_KEY`, `GULLIN_JWT_PUBLIC_KEY` (PEM, required)
    /// - `GULLIN_JWT_ISSUER`, `GULLIN_ACCESS_TOKEN_SECS`, `GULLIN_REFRESH_WINDOW_SECS`
    /// - `GULLIN_PASSWORD_PEPPER`, `GULLIN_MIN_PASSWORD_LENGTH`
    /// - `GULLIN_TOTP_KEY` (64 hex digits; TOTP is disabled without it)
    /// - `GULLIN_CODE_LIFETIME_SECS`, `GULLIN_CHALLENGE_LIFETIME_SECS`
    /// - `GULLIN_CHALLENGE_SWEEP_SECS`
    /// - the provider and KYC variables of [`ProviderConfig`] and [`KycConfig`]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_defaults = DbConfig::default();
        let db = DbConfig {
            url: lookup("GULLIN_DB_URL").unwrap_or(db_defaults.url),
            namespace: lookup("GULLIN_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: lookup("GULLIN_DB_DATABASE").unwrap_or(db_defaults.database),
            username: lookup("GULLIN_DB_USER").unwrap_or(db_defaults.username),
            password: lookup("GULLIN_DB_PASSWORD").unwrap_or(db_defaults.password),
        };

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_private_key_pem: required(&lookup, "GULLIN_JWT_PRIVATE_KEY")?,
            jwt_public_key_pem: required(&lookup, "GULLIN_JWT_PUBLIC_KEY")?,
            access_token_lifetime_secs: parsed(
                &lookup,
                "GULLIN_ACCESS_TOKEN_SECS",
                defaults.access_token_lifetime_secs,
            )?,
            refresh_window_secs: parsed(
                &lookup,
                "GULLIN_REFRESH_WINDOW_SECS",
                defaults.refresh_window_secs,
            )?,
            jwt_issuer: lookup("GULLIN_JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            pepper: lookup("GULLIN_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            min_password_length: parsed(
                &lookup,
                "GULLIN_MIN_PASSWORD_LENGTH",
                defaults.min_password_length,
            )?,
            totp_encryption_key: lookup("GULLIN_TOTP_KEY")
                .map(|raw| parse_key(&raw))
                .transpose()
                .map_err(|reason| ConfigError::Invalid {
                    var: "GULLIN_TOTP_KEY",
                    reason,
                })?,
            totp_issuer: defaults.totp_issuer,
            challenge_lifetime_secs: parsed(
                &lookup,
                "GULLIN_CHALLENGE_LIFETIME_SECS",
                defaults.challenge_lifetime_secs,
            )?,
            code_lifetime_secs: parsed(
                &lookup,
                "GULLIN_CODE_LIFETIME_SECS",
                defaults.code_lifetime_secs,
            )?,
            code_length: defaults.code_length,
        };

        Ok(Self {
            db,
            auth,
            provider: ProviderConfig::from_lookup(&lookup)?,
            kyc: KycConfig::from_lookup(&lookup),
            challenge_sweep_secs: parsed(&lookup, "GULLIN_CHALLENGE_SWEEP_SECS", 60)?,
        })
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<String, ConfigError> {
    lookup(var)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(var))
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

/// 256-bit key from 64 hex digits.
fn parse_key(raw: &str) -> Result<[u8; 32], String> {
    let bytes = hex::decode(raw.trim()).map_err(|e| e.to_string())?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| format!("expected 32 bytes, got {}", bytes.len()))
}
