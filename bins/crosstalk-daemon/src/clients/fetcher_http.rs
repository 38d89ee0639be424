use async_trait::async_trait;
use crosstalk_core::error::BridgeError;
use crosstalk_core::send::ContentFetcher;
use std::time::Duration;

pub struct HttpContentFetcher {
    http: reqwest::Client,
}

impl HttpContentFetcher {
    pub fn new(timeout: Duration) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Matrix(format!("fetcher client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>, BridgeError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::Matrix(format!("download {}: {}", url, e)))?;
        if !response.status().is_success() {
            return Err(BridgeError::Matrix(format!(
                "download {}: status {}",
                url,
                response.status().as_u16()
            )));
        }
        if let Some(length) = response.content_length() {
            if length as usize > max_bytes {
                return Err(BridgeError::Validation("attachment too large".to_string()));
            }
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Matrix(format!("download {}: {}", url, e)))?;
        if bytes.len() > max_bytes {
            return Err(BridgeError::Validation("attachment too large".to_string()));
        }
        Ok(bytes.to_vec())
    }
}
