use crate::error::BridgeError;
use crosstalk_api::types::MappingEntry;
use crosstalk_api::validation::validate_mapping_entry;
use log::warn;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub fn is_matrix_id(identifier: &str) -> bool {
    identifier.starts_with('@') && identifier.contains(':')
}

#[derive(Default)]
struct MappingTables {
    by_number: HashMap<String, MappingEntry>,
    // alt number -> canonical number
    alt_index: HashMap<String, String>,
}

/// Known external-identifier to Matrix-identity associations. One lock
/// guards both the primary map and the alt-number reverse index so readers
/// never observe them inconsistently.
#[derive(Default)]
pub struct MappingStore {
    inner: RwLock<MappingTables>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Well-formed Matrix ids resolve to themselves; everything else goes
    /// through the canonical-number map, then the alt-number index.
    pub async fn resolve(&self, identifier: &str) -> Option<String> {
        if is_matrix_id(identifier) {
            return Some(identifier.to_string());
        }
        let tables = self.inner.read().await;
        if let Some(entry) = tables.by_number.get(identifier) {
            return Some(entry.matrix_id.clone());
        }
        tables
            .alt_index
            .get(identifier)
            .and_then(|number| tables.by_number.get(number))
            .map(|entry| entry.matrix_id.clone())
    }

    /// Maps a Matrix identity back to its display identifier. Alt-numbers
    /// are never surfaced: a match always yields the canonical number.
    pub async fn reverse_resolve(&self, matrix_id: &str) -> String {
        let tables = self.inner.read().await;
        for entry in tables.by_number.values() {
            if entry.matrix_id.eq_ignore_ascii_case(matrix_id) {
                if !entry.number.is_empty() {
                    return entry.number.clone();
                }
                if let Some(name) = entry.display_name.as_ref() {
                    return name.clone();
                }
            }
        }
        matrix_id.to_string()
    }

    pub async fn upsert(&self, entry: MappingEntry) -> Result<(), BridgeError> {
        validate_mapping_entry(&entry).map_err(|e| BridgeError::Validation(e.to_string()))?;
        let mut tables = self.inner.write().await;
        if let Some(previous) = tables.by_number.remove(&entry.number) {
            for alt in previous.alt_numbers.iter() {
                tables.alt_index.remove(alt);
            }
        }
        for alt in entry.alt_numbers.iter() {
            tables.alt_index.insert(alt.clone(), entry.number.clone());
        }
        tables.by_number.insert(entry.number.clone(), entry);
        Ok(())
    }

    pub async fn get(&self, number: &str) -> Result<MappingEntry, BridgeError> {
        let tables = self.inner.read().await;
        tables
            .by_number
            .get(number)
            .cloned()
            .ok_or(BridgeError::NotFound)
    }

    pub async fn list(&self) -> Vec<MappingEntry> {
        let tables = self.inner.read().await;
        let mut entries: Vec<MappingEntry> = tables.by_number.values().cloned().collect();
        entries.sort_by(|a, b| a.number.cmp(&b.number));
        entries
    }

    /// Applies `upsert` to each entry from a batch source. Entries that do
    /// not validate are skipped and logged, never fatal. Returns the number
    /// of entries applied.
    pub async fn bulk_load(&self, entries: Vec<MappingEntry>) -> usize {
        let mut applied = 0;
        for entry in entries {
            let number = entry.number.clone();
            match self.upsert(entry).await {
                Ok(()) => applied += 1,
                Err(err) => warn!("skipping mapping entry {:?}: {}", number, err),
            }
        }
        applied
    }

    pub async fn len(&self) -> usize {
        let tables = self.inner.read().await;
        tables.by_number.len()
    }
}
