//! HTTP client for the identity verification provider.
//!
//! One JSON `POST` per submission, authenticated with HTTP basic auth.
//! The provider answers with a transaction id (`tid`) and a state code
//! (`A` accepted, `R` under review, `D` denied).

use std::time::Duration;

use gullin_core::error::GullinResult;
use gullin_core::models::identity::IdentityState;
use gullin_core::provider::{IdentityProvider, ProviderPayload, ProviderResponse};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::error::ProviderError;

#[derive(Debug, Clone)]
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    config: ProviderConfig,
}

impl HttpIdentityProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, config })
    }

    async fn post(&self, payload: &ProviderPayload) -> Result<ProviderResponse, ProviderError> {
        let endpoint = self.config.endpoint.to_string();
        let resp = self
            .http
            .post(self.config.endpoint.clone())
            .basic_auth(&self.config.username, Some(&self.config.api_key))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout {
                        endpoint: endpoint.clone(),
                    }
                } else {
                    ProviderError::Http {
                        endpoint: endpoint.clone(),
                        source: e,
                    }
                }
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| ProviderError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(ProviderError::Rejected(body));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body)
    }
}

/// Extract `tid` and `state` from a provider answer. The transaction id
/// is accepted as a string or a number.
pub fn parse_response(body: &str) -> Result<ProviderResponse, ProviderError> {
    let raw: Value =
        serde_json::from_str(body).map_err(|e| ProviderError::Unparseable(e.to_string()))?;

    let transaction_id = match raw.get("tid") {
        Some(Value::String(tid)) if !tid.is_empty() => tid.clone(),
        Some(Value::Number(tid)) => tid.to_string(),
        _ => return Err(ProviderError::Unparseable("missing tid".into())),
    };
    let code = raw
        .get("state")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::Unparseable("missing state".into()))?;
    let state = IdentityState::from_provider_code(code)
        .ok_or_else(|| ProviderError::Unparseable(format!("unknown state code {code:?}")))?;

    Ok(ProviderResponse {
        transaction_id,
        state,
        raw,
    })
}

impl IdentityProvider for HttpIdentityProvider {
    async fn submit(&self, payload: &ProviderPayload) -> GullinResult<ProviderResponse> {
        match self.post(payload).await {
            Ok(response) => {
                info!(
                    transaction_id = %response.transaction_id,
                    state = ?response.state,
                    "Identity provider accepted submission"
                );
                Ok(response)
            }
            Err(e) => {
                warn!(error = %e, "Identity provider call failed");
                Err(e.into())
            }
        }
    }
}
