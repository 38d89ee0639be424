use crosstalk_core::config::BridgeConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct CrosstalkConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    pub homeserver: HomeserverConfig,
    #[serde(default)]
    pub bridge: BridgeSection,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    /// JSON file with mapping entries applied through bulk load at startup.
    #[serde(default)]
    pub mappings_file: Option<PathBuf>,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct HomeserverConfig {
    pub base_url: String,
    pub domain: String,
    pub access_token: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BridgeSection {
    #[serde(default)]
    pub room_cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub participant_cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub auth_cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub max_attachment_bytes: Option<usize>,
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
    #[serde(default)]
    pub default_push_sound: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub gateway_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io")]
    Io,
    #[error("parse")]
    Parse,
}

fn default_listen() -> String {
    "127.0.0.1:8435".to_string()
}

pub fn load_config(path: &Path) -> Result<CrosstalkConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|_| ConfigError::Io)?;
    toml::from_str(&content).map_err(|_| ConfigError::Parse)
}

impl CrosstalkConfig {
    pub fn bridge_config(&self) -> BridgeConfig {
        let defaults = BridgeConfig::default();
        BridgeConfig {
            homeserver_domain: self.homeserver.domain.clone(),
            room_cache_ttl_secs: self
                .bridge
                .room_cache_ttl_secs
                .unwrap_or(defaults.room_cache_ttl_secs),
            participant_cache_ttl_secs: self
                .bridge
                .participant_cache_ttl_secs
                .unwrap_or(defaults.participant_cache_ttl_secs),
            auth_cache_ttl_secs: self
                .bridge
                .auth_cache_ttl_secs
                .unwrap_or(defaults.auth_cache_ttl_secs),
            max_attachment_bytes: self
                .bridge
                .max_attachment_bytes
                .unwrap_or(defaults.max_attachment_bytes),
            max_body_bytes: self
                .bridge
                .max_body_bytes
                .unwrap_or(defaults.max_body_bytes),
            default_push_sound: self
                .bridge
                .default_push_sound
                .clone()
                .unwrap_or(defaults.default_push_sound),
        }
    }
}
