//! KYC and identity provider configuration.
//!
//! Defaults point at a local provider stub. Override via environment
//! variables or explicit construction.

use url::Url;

/// Settings for the verification workflow itself.
#[derive(Debug, Clone)]
pub struct KycConfig {
    /// Internal review team, notified on accredited-investor requests.
    pub team_email: String,
}

impl Default for KycConfig {
    fn default() -> Self {
        Self {
            team_email: "team@gullin.io".into(),
        }
    }
}

impl KycConfig {
    /// Variables:
    /// - `GULLIN_TEAM_EMAIL` (default: `team@gullin.io`)
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            team_email: lookup("GULLIN_TEAM_EMAIL").unwrap_or(defaults.team_email),
        }
    }
}

/// Connection settings for the identity verification provider.
///
/// Custom `Debug` implementation redacts the `api_key` field.
#[derive(Clone)]
pub struct ProviderConfig {
    pub endpoint: Url,
    /// Basic-auth user name.
    pub username: String,
    /// Basic-auth password issued by the provider.
    pub api_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `GULLIN_PROVIDER_URL` (default: `http://127.0.0.1:9090/im/account/consumer`)
    /// - `GULLIN_PROVIDER_USER` (default: `gullin`)
    /// - `GULLIN_PROVIDER_KEY` (required)
    /// - `GULLIN_PROVIDER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with variables resolved by
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("GULLIN_PROVIDER_KEY").ok_or(ConfigError::MissingKey)?;
        Ok(Self {
            endpoint: env_url(
                &lookup,
                "GULLIN_PROVIDER_URL",
                "http://127.0.0.1:9090/im/account/consumer",
            )?,
            username: lookup("GULLIN_PROVIDER_USER").unwrap_or_else(|| "gullin".into()),
            api_key,
            timeout_secs: lookup("GULLIN_PROVIDER_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Configuration pointing at `base` with test credentials.
    pub fn local(base: &str, api_key: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: Url::parse(base)
                .map_err(|e| ConfigError::InvalidUrl("endpoint".to_string(), e.to_string()))?,
            username: "gullin".into(),
            api_key: api_key.to_string(),
            timeout_secs: 5,
        })
    }
}

fn env_url(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: &str,
) -> Result<Url, ConfigError> {
    let raw = lookup(var).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GULLIN_PROVIDER_KEY environment variable is required")]
    MissingKey,

    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
