// Ingestion pipeline: parse, normalize, deduplicate, commit, audit.

pub mod dedupe;
pub mod normalize;
pub mod parser;

use crate::domain::{AuthenticatedUser, UploadAudit};
use crate::error::{IngestError, Result};
use crate::storage::DatasetStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Outcome counts for one ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
    /// True when this upload created the dataset (first-ever ingestion).
    pub created: bool,
    pub inserted: usize,
    pub duplicates: usize,
    /// Rows soft-dropped by the normalizer for a non-numeric amount.
    pub dropped: usize,
}

/// Sequences one upload through parse, normalize, duplicate detection,
/// commit, and audit.
pub struct IngestPipeline {
    store: Arc<dyn DatasetStore>,
    /// Serializes the exists/read/detect/append/audit span. Without it two
    /// concurrent uploads can read the same snapshot and both insert
    /// overlapping rows.
    commit_lock: tokio::sync::Mutex<()>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn DatasetStore>) -> Self {
        Self {
            store,
            commit_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> Arc<dyn DatasetStore> {
        self.store.clone()
    }

    /// Ingest one uploaded file for an authenticated uploader.
    ///
    /// Parse and schema failures abort with nothing persisted. Past
    /// validation, soft-dropped rows and duplicate exclusions produce a
    /// partial commit, and one audit entry is recorded even when zero rows
    /// were inserted. An audit write failure propagates without rolling back
    /// the row append.
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        uploader: &AuthenticatedUser,
    ) -> Result<IngestReport> {
        let format = parser::FileFormat::from_filename(filename).ok_or_else(|| {
            IngestError::Parse(format!("unsupported file extension: '{}'", filename))
        })?;
        let table = parser::parse(bytes, format)?;
        let batch = normalize::normalize(&table, &uploader.username)?;
        if batch.dropped > 0 {
            warn!(
                filename,
                dropped = batch.dropped,
                "dropped rows with non-numeric Amount"
            );
        }

        let _guard = self.commit_lock.lock().await;

        let mut report = IngestReport {
            created: false,
            inserted: 0,
            duplicates: 0,
            dropped: batch.dropped,
        };

        // Both branches go through the detector: on a fresh dataset the
        // comparison set is empty, but a file repeating its own rows must
        // still store each natural key once.
        let existing = if self.store.exists().await? {
            self.store.read_all().await?
        } else {
            report.created = true;
            Vec::new()
        };
        let outcome = dedupe::partition(batch.rows, &existing);
        report.duplicates = outcome.duplicates.len();
        if report.created || !outcome.fresh.is_empty() {
            // An empty append on the created path still establishes the
            // dataset's schema.
            report.inserted = self.store.append(&outcome.fresh).await?;
        }

        let audit = UploadAudit {
            user_id: uploader.id,
            filename: filename.to_string(),
            uploaded_at: Utc::now(),
        };
        if let Err(e) = self.store.record_audit(&audit).await {
            // The rows are already committed; surface the failure but do
            // not unwind the append.
            error!(filename, "audit write failed after row commit: {e}");
            return Err(e);
        }

        info!(
            filename,
            uploader = %uploader.username,
            created = report.created,
            inserted = report.inserted,
            duplicates = report.duplicates,
            dropped = report.dropped,
            "ingestion committed"
        );
        Ok(report)
    }
}
