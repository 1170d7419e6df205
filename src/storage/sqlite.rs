use super::DatasetStore;
use crate::domain::{Record, UploadAudit};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// SQLite-backed store. The dataset table is created lazily on first append
/// (that first upload establishes the schema); the audit table is part of the
/// database bootstrap.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS uploads (
                user_id     TEXT NOT NULL,
                filename    TEXT NOT NULL,
                uploaded_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn ensure_data_table(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS data_table (
                species     TEXT NOT NULL,
                chemical    TEXT NOT NULL,
                amount      REAL NOT NULL,
                doi         TEXT NOT NULL,
                uploaded_by TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

#[async_trait]
impl DatasetStore for SqliteStore {
    async fn exists(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'data_table'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    async fn read_all(&self) -> Result<Vec<Record>> {
        let conn = self.conn.lock().unwrap();
        // A fresh database has no data_table yet; an empty read is the
        // correct answer for listing surfaces, not an error.
        let table_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'data_table'",
            [],
            |row| row.get(0),
        )?;
        if table_count == 0 {
            return Ok(Vec::new());
        }
        let mut stmt = conn.prepare(
            "SELECT species, chemical, amount, doi, uploaded_by FROM data_table ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Record {
                species: row.get(0)?,
                chemical: row.get(1)?,
                amount: row.get(2)?,
                doi: row.get(3)?,
                uploaded_by: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    async fn append(&self, rows: &[Record]) -> Result<usize> {
        let mut conn = self.conn.lock().unwrap();
        Self::ensure_data_table(&conn)?;

        let tx = conn.transaction().map_err(IngestError::from)?;
        for record in rows {
            tx.execute(
                "INSERT INTO data_table (species, chemical, amount, doi, uploaded_by)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.species,
                    record.chemical,
                    record.amount,
                    record.doi,
                    record.uploaded_by
                ],
            )?;
        }
        tx.commit().map_err(IngestError::from)?;

        debug!("Appended {} row(s) to data_table", rows.len());
        Ok(rows.len())
    }

    async fn record_audit(&self, audit: &UploadAudit) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO uploads (user_id, filename, uploaded_at) VALUES (?1, ?2, ?3)",
            params![
                audit.user_id.to_string(),
                audit.filename,
                audit.uploaded_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    async fn audits(&self) -> Result<Vec<UploadAudit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT user_id, filename, uploaded_at FROM uploads ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            let user_id: String = row.get(0)?;
            let filename: String = row.get(1)?;
            let uploaded_at: String = row.get(2)?;
            Ok((user_id, filename, uploaded_at))
        })?;

        let mut audits = Vec::new();
        for row in rows {
            let (user_id, filename, uploaded_at) = row.map_err(IngestError::from)?;
            let user_id = Uuid::parse_str(&user_id)
                .map_err(|e| IngestError::Storage(format!("malformed user id in uploads: {e}")))?;
            let uploaded_at = DateTime::parse_from_rfc3339(&uploaded_at)
                .map_err(|e| IngestError::Storage(format!("malformed timestamp in uploads: {e}")))?
                .with_timezone(&Utc);
            audits.push(UploadAudit {
                user_id,
                filename,
                uploaded_at,
            });
        }
        Ok(audits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(species: &str, amount: f64) -> Record {
        Record {
            species: species.to_string(),
            chemical: "mercury".to_string(),
            amount,
            doi: "10.1/a".to_string(),
            uploaded_by: "alice".to_string(),
        }
    }

    fn open_temp() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("chemdata.db")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn dataset_does_not_exist_until_first_append() {
        let (_dir, store) = open_temp();
        assert!(!store.exists().await.unwrap());

        store.append(&[record("salmon", 1.5)]).await.unwrap();
        assert!(store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn empty_append_establishes_the_schema() {
        let (_dir, store) = open_temp();
        let committed = store.append(&[]).await.unwrap();
        assert_eq!(committed, 0);
        assert!(store.exists().await.unwrap());
        assert!(store.read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rows_round_trip_in_insertion_order() {
        let (_dir, store) = open_temp();
        store
            .append(&[record("salmon", 1.5), record("trout", 0.25)])
            .await
            .unwrap();

        let rows = store.read_all().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].species, "salmon");
        assert_eq!(rows[1].species, "trout");
        assert_eq!(rows[1].amount, 0.25);
    }

    #[tokio::test]
    async fn audit_entries_round_trip() {
        let (_dir, store) = open_temp();
        let audit = UploadAudit {
            user_id: Uuid::new_v4(),
            filename: "fish.csv".to_string(),
            uploaded_at: Utc::now(),
        };
        store.record_audit(&audit).await.unwrap();

        let audits = store.audits().await.unwrap();
        assert_eq!(audits.len(), 1);
        assert_eq!(audits[0].user_id, audit.user_id);
        assert_eq!(audits[0].filename, "fish.csv");
    }
}
