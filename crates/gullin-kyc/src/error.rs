//! Identity provider client errors.

use gullin_core::error::GullinError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("provider answered HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The applicant data was refused as malformed (HTTP 400/422).
    #[error("provider rejected the payload: {0}")]
    Rejected(String),

    #[error("unparseable provider response: {0}")]
    Unparseable(String),
}

impl From<ProviderError> for GullinError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected(msg) => GullinError::validation(msg),
            other => GullinError::ProviderUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_payload_is_a_validation_failure() {
        let err: GullinError = ProviderError::Rejected("bad dob".into()).into();
        assert_eq!(err.kind(), "validation_failed");
    }

    #[test]
    fn everything_else_is_provider_unavailable() {
        let err: GullinError = ProviderError::Timeout {
            endpoint: "http://idv".into(),
        }
        .into();
        assert_eq!(err.kind(), "provider_unavailable");

        let err: GullinError = ProviderError::Unparseable("missing tid".into()).into();
        assert_eq!(err.kind(), "provider_unavailable");
    }
}
