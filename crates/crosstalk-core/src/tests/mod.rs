pub mod auth_tests;
pub mod content_tests;
pub mod mapping_tests;
pub mod push_tests;
pub mod rooms_tests;

use crate::auth::InMemoryValidator;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::matrix::InMemoryMatrix;
use crate::push::{InMemoryTokenStore, PushDelivery, PushGateway};
use crate::send::ContentFetcher;
use crate::Bridge;
use async_trait::async_trait;
use crosstalk_api::types::{MappingEntry, PushPayload};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DOMAIN: &str = "srv";

pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        homeserver_domain: DOMAIN.to_string(),
        ..BridgeConfig::default()
    }
}

pub fn entry(number: &str, matrix_id: &str, alt_numbers: &[&str]) -> MappingEntry {
    MappingEntry {
        number: number.to_string(),
        matrix_id: matrix_id.to_string(),
        display_name: None,
        alt_numbers: alt_numbers.iter().map(|a| a.to_string()).collect(),
    }
}

#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<PushPayload>>,
    pub invalid_tokens: Mutex<HashSet<String>>,
    pub failing_tokens: Mutex<HashSet<String>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn mark_invalid(&self, token: &str) {
        self.invalid_tokens.lock().await.insert(token.to_string());
    }

    pub async fn mark_failing(&self, token: &str) {
        self.failing_tokens.lock().await.insert(token.to_string());
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(&self, payload: &PushPayload) -> Result<PushDelivery, BridgeError> {
        if self.failing_tokens.lock().await.contains(&payload.token) {
            return Err(BridgeError::Matrix("gateway unavailable".to_string()));
        }
        if self.invalid_tokens.lock().await.contains(&payload.token) {
            self.sent.lock().await.push(payload.clone());
            return Ok(PushDelivery::TokenRejected);
        }
        self.sent.lock().await.push(payload.clone());
        Ok(PushDelivery::Accepted)
    }
}

#[derive(Default)]
pub struct InMemoryFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, url: &str, bytes: Vec<u8>) {
        self.files.lock().await.insert(url.to_string(), bytes);
    }
}

#[async_trait]
impl ContentFetcher for InMemoryFetcher {
    async fn fetch(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>, BridgeError> {
        let files = self.files.lock().await;
        let bytes = files
            .get(url)
            .cloned()
            .ok_or_else(|| BridgeError::Matrix(format!("download failed for {}", url)))?;
        if bytes.len() > max_bytes {
            return Err(BridgeError::Validation("attachment too large".to_string()));
        }
        Ok(bytes)
    }
}

pub struct TestHarness {
    pub bridge: Bridge,
    pub matrix: Arc<InMemoryMatrix>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub gateway: Arc<RecordingGateway>,
    pub fetcher: Arc<InMemoryFetcher>,
    pub validator: Arc<InMemoryValidator>,
}

pub fn harness() -> TestHarness {
    harness_with_config(test_config())
}

pub fn harness_with_config(config: BridgeConfig) -> TestHarness {
    let matrix = Arc::new(InMemoryMatrix::new(DOMAIN));
    let tokens = Arc::new(InMemoryTokenStore::new());
    let gateway = Arc::new(RecordingGateway::new());
    let fetcher = Arc::new(InMemoryFetcher::new());
    let validator = Arc::new(InMemoryValidator::new());
    let bridge = Bridge::new(
        config,
        matrix.clone(),
        fetcher.clone(),
        validator.clone(),
        tokens.clone(),
        gateway.clone(),
    );
    TestHarness {
        bridge,
        matrix,
        tokens,
        gateway,
        fetcher,
        validator,
    }
}

pub async fn seed_pair(harness: &TestHarness) {
    harness
        .bridge
        .upsert_mapping(entry("201", "@alice:srv", &["91201"]))
        .await
        .expect("alice mapping");
    harness
        .bridge
        .upsert_mapping(entry("202", "@bob:srv", &[]))
        .await
        .expect("bob mapping");
}
