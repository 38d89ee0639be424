use async_trait::async_trait;
use crosstalk_api::types::MappingEntry;
use crosstalk_core::auth::{CredentialOutcome, CredentialValidator};
use crosstalk_core::error::BridgeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ValidateRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct ValidateResponse {
    ok: bool,
    #[serde(default)]
    entries: Vec<MappingEntry>,
}

pub struct HttpCredentialValidator {
    url: String,
    http: reqwest::Client,
}

impl HttpCredentialValidator {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Matrix(format!("validator client: {}", e)))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl CredentialValidator for HttpCredentialValidator {
    async fn validate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<CredentialOutcome, BridgeError> {
        let response = self
            .http
            .post(&self.url)
            .json(&ValidateRequest { identifier, secret })
            .send()
            .await
            .map_err(|e| BridgeError::Matrix(format!("validator: {}", e)))?;
        if !response.status().is_success() {
            return Err(BridgeError::Matrix(format!(
                "validator status {}",
                response.status().as_u16()
            )));
        }
        let body: ValidateResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Matrix(format!("validator body: {}", e)))?;
        Ok(CredentialOutcome {
            ok: body.ok,
            entries: body.entries,
        })
    }
}

/// Used when no validator service is configured; rejects everything so
/// only preloaded and admin-managed mappings resolve.
pub struct RejectingValidator;

#[async_trait]
impl CredentialValidator for RejectingValidator {
    async fn validate(
        &self,
        _identifier: &str,
        _secret: &str,
    ) -> Result<CredentialOutcome, BridgeError> {
        Ok(CredentialOutcome::default())
    }
}
