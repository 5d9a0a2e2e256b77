use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tokio::sync::RwLock;

use super::{CaseRepository, StoreError};
use crate::core::{CaseLedgers, SoADocument};

/// Process-local repository used by the HTTP server and tests.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    ledgers: RwLock<HashMap<String, CaseLedgers>>,
    documents: RwLock<BTreeMap<(String, u32), Value>>,
}

impl MemoryRepository {
    pub fn with_ledgers(ledgers: HashMap<String, CaseLedgers>) -> Self {
        Self {
            ledgers: RwLock::new(ledgers),
            documents: RwLock::default(),
        }
    }

    pub async fn put_ledgers(&self, case_id: &str, ledgers: CaseLedgers) {
        self.ledgers
            .write()
            .await
            .insert(case_id.to_string(), ledgers);
    }

    /// Stores a raw record as-is, bypassing the typed model.
    pub async fn put_raw_document(&self, case_id: &str, version: u32, raw: Value) {
        self.documents
            .write()
            .await
            .insert((case_id.to_string(), version), raw);
    }

    pub async fn versions(&self, case_id: &str) -> Vec<u32> {
        self.documents
            .read()
            .await
            .keys()
            .filter(|(case, _)| case == case_id)
            .map(|(_, version)| *version)
            .collect()
    }
}

impl CaseRepository for MemoryRepository {
    async fn ledgers(&self, case_id: &str) -> Result<CaseLedgers, StoreError> {
        Ok(self
            .ledgers
            .read()
            .await
            .get(case_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn latest_document(&self, case_id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .filter(|((case, _), _)| case == case_id)
            .max_by_key(|((_, version), _)| *version)
            .map(|(_, raw)| raw.clone()))
    }

    async fn upsert_document(&self, document: &SoADocument) -> Result<(), StoreError> {
        let raw = serde_json::to_value(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.documents
            .write()
            .await
            .insert((document.case_id.clone(), document.version), raw);
        Ok(())
    }
}
