pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use crate::domain::{Record, UploadAudit};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence boundary for the shared dataset and its upload audit log.
///
/// The dataset is append-only: there is no update or delete path. `read_all`
/// is a full scan used once per ingestion to build the duplicate-comparison
/// set, which is fine at the dataset sizes this service holds but bounds how
/// far it scales.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Whether the dataset collection has been created yet.
    async fn exists(&self) -> Result<bool>;

    /// Full scan of the dataset's current contents.
    async fn read_all(&self) -> Result<Vec<Record>>;

    /// Persist rows, creating the dataset on first use (an empty append
    /// still establishes the schema). Returns the committed count.
    async fn append(&self, rows: &[Record]) -> Result<usize>;

    /// Persist one upload audit entry.
    async fn record_audit(&self, audit: &UploadAudit) -> Result<()>;

    /// Upload history, oldest first.
    async fn audits(&self) -> Result<Vec<UploadAudit>>;
}
