use async_trait::async_trait;
use crosstalk_api::types::PushPayload;
use crosstalk_core::error::BridgeError;
use crosstalk_core::push::{PushDelivery, PushGateway};
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    rejected: Vec<String>,
}

/// Forwards translated payloads to the softphone push service.
pub struct HttpPushGateway {
    url: String,
    http: reqwest::Client,
}

impl HttpPushGateway {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Matrix(format!("push client: {}", e)))?;
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

#[async_trait]
impl PushGateway for HttpPushGateway {
    async fn send(&self, payload: &PushPayload) -> Result<PushDelivery, BridgeError> {
        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| BridgeError::Matrix(format!("push gateway: {}", e)))?;
        if !response.status().is_success() {
            return Err(BridgeError::Matrix(format!(
                "push gateway status {}",
                response.status().as_u16()
            )));
        }
        let body: GatewayResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::Matrix(format!("push gateway body: {}", e)))?;
        if body.rejected.iter().any(|t| t == &payload.token) {
            return Ok(PushDelivery::TokenRejected);
        }
        Ok(PushDelivery::Accepted)
    }
}

/// Stand-in used when no gateway is configured; drops every payload.
pub struct NullPushGateway;

#[async_trait]
impl PushGateway for NullPushGateway {
    async fn send(&self, _payload: &PushPayload) -> Result<PushDelivery, BridgeError> {
        Ok(PushDelivery::Accepted)
    }
}
