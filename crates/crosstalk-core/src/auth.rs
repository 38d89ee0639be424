use crate::cache::TtlCache;
use crate::error::BridgeError;
use crate::mapping::MappingStore;
use async_trait::async_trait;
use crosstalk_api::types::MappingEntry;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialOutcome {
    pub ok: bool,
    pub entries: Vec<MappingEntry>,
}

/// External credential-validation service. Consulted only for identifiers
/// that have no existing mapping.
#[async_trait]
pub trait CredentialValidator: Send + Sync {
    async fn validate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<CredentialOutcome, BridgeError>;
}

pub struct Authenticator {
    validator: Arc<dyn CredentialValidator>,
    mappings: Arc<MappingStore>,
    cache: TtlCache<String, String>,
}

impl Authenticator {
    pub fn new(
        validator: Arc<dyn CredentialValidator>,
        mappings: Arc<MappingStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            validator,
            mappings,
            cache: TtlCache::new(cache_ttl),
        }
    }

    /// Resolves an identifier to its Matrix identity, bootstrapping the
    /// mapping through the upstream validator when it is unknown.
    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<String, BridgeError> {
        if let Some(matrix_id) = self.mappings.resolve(identifier).await {
            return Ok(matrix_id);
        }
        let cache_key = format!("{}\n{}", identifier, secret);
        if let Some(matrix_id) = self.cache.get(&cache_key).await {
            return Ok(matrix_id);
        }
        let outcome = self.validator.validate(identifier, secret).await?;
        if !outcome.ok {
            return Err(BridgeError::Auth);
        }
        let applied = self.mappings.bulk_load(outcome.entries).await;
        info!("credential bootstrap for {} loaded {} entries", identifier, applied);
        let matrix_id = self
            .mappings
            .resolve(identifier)
            .await
            .ok_or(BridgeError::Auth)?;
        self.cache.set(cache_key, matrix_id.clone()).await;
        Ok(matrix_id)
    }
}

/// Validator backed by a fixed credential table, for tests and local runs.
#[derive(Default)]
pub struct InMemoryValidator {
    accounts: Mutex<HashMap<String, (String, Vec<MappingEntry>)>>,
}

impl InMemoryValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, identifier: &str, secret: &str, entries: Vec<MappingEntry>) {
        let mut accounts = self.accounts.lock().await;
        accounts.insert(identifier.to_string(), (secret.to_string(), entries));
    }
}

#[async_trait]
impl CredentialValidator for InMemoryValidator {
    async fn validate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<CredentialOutcome, BridgeError> {
        let accounts = self.accounts.lock().await;
        match accounts.get(identifier) {
            Some((expected, entries)) if expected == secret => Ok(CredentialOutcome {
                ok: true,
                entries: entries.clone(),
            }),
            _ => Ok(CredentialOutcome::default()),
        }
    }
}
