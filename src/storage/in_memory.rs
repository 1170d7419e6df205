use super::DatasetStore;
use crate::domain::{Record, UploadAudit};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// In-memory store for development and testing. Mirrors the SQLite store's
/// create-on-first-append behavior so `exists` semantics match.
pub struct InMemoryStore {
    dataset: Arc<Mutex<Option<Vec<Record>>>>,
    audits: Arc<Mutex<Vec<UploadAudit>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            dataset: Arc::new(Mutex::new(None)),
            audits: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl DatasetStore for InMemoryStore {
    async fn exists(&self) -> Result<bool> {
        Ok(self.dataset.lock().unwrap().is_some())
    }

    async fn read_all(&self) -> Result<Vec<Record>> {
        let dataset = self.dataset.lock().unwrap();
        Ok(dataset.as_deref().unwrap_or_default().to_vec())
    }

    async fn append(&self, rows: &[Record]) -> Result<usize> {
        let mut dataset = self.dataset.lock().unwrap();
        let table = dataset.get_or_insert_with(Vec::new);
        table.extend_from_slice(rows);

        debug!("Appended {} row(s), dataset now holds {}", rows.len(), table.len());
        Ok(rows.len())
    }

    async fn record_audit(&self, audit: &UploadAudit) -> Result<()> {
        self.audits.lock().unwrap().push(audit.clone());
        Ok(())
    }

    async fn audits(&self) -> Result<Vec<UploadAudit>> {
        Ok(self.audits.lock().unwrap().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(species: &str) -> Record {
        Record {
            species: species.to_string(),
            chemical: "mercury".to_string(),
            amount: 1.5,
            doi: "10.1/a".to_string(),
            uploaded_by: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn exists_flips_on_first_append() {
        let store = InMemoryStore::new();
        assert!(!store.exists().await.unwrap());

        store.append(&[]).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let store = InMemoryStore::new();
        let committed = store.append(&[record("salmon"), record("trout")]).await.unwrap();
        assert_eq!(committed, 2);

        let rows = store.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].species, "salmon");
    }
}
