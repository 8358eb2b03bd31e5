//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use super::store::JobMutation;
use super::{JobKey, JobRecord, JobState, JobStore, JobStoreError};

/// SQLite-backed job store.
///
/// All access goes through one connection guarded by a mutex, which makes
/// every `mutate` a serialized read-modify-write.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, JobStoreError> {
        let conn = Connection::open(path).map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| JobStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                job_key TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                collection_id TEXT NOT NULL,
                item_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                record TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_owner_collection ON jobs(owner_id, collection_id);
            "#,
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn read_record(conn: &Connection, key: &JobKey) -> Result<Option<JobRecord>, JobStoreError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT record FROM jobs WHERE job_key = ?",
                params![key.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        json.map(|json| {
            serde_json::from_str(&json).map_err(|e| JobStoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    fn write_record(
        conn: &Connection,
        key: &JobKey,
        record: &JobRecord,
    ) -> Result<(), JobStoreError> {
        let json =
            serde_json::to_string(record).map_err(|e| JobStoreError::Serialization(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO jobs (job_key, owner_id, collection_id, item_id, created_at, record, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_key) DO UPDATE SET record = excluded.record, updated_at = excluded.updated_at
            "#,
            params![
                key.to_string(),
                key.owner_id,
                key.collection_id,
                key.item_id,
                key.created_at,
                json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn query_entries(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<(JobKey, JobRecord)>, JobStoreError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params, |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        let mut entries = Vec::new();
        for row in rows {
            let (raw_key, json) = row.map_err(|e| JobStoreError::Database(e.to_string()))?;
            // A single unreadable row must not hide every other job.
            let key: JobKey = match raw_key.parse() {
                Ok(key) => key,
                Err(e) => {
                    warn!(job_key = %raw_key, error = %e, "Skipping job with malformed key");
                    continue;
                }
            };
            let record: JobRecord = match serde_json::from_str(&json) {
                Ok(record) => record,
                Err(e) => {
                    warn!(job = %key, error = %e, "Skipping job with undecodable record");
                    continue;
                }
            };
            entries.push((key, record));
        }

        Ok(entries)
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, key: &JobKey, state: JobState) -> Result<JobRecord, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        if Self::read_record(&conn, key)?.is_some() {
            return Err(JobStoreError::AlreadyExists(key.to_string()));
        }

        let record = JobRecord::with_state(state);
        Self::write_record(&conn, key, &record)?;
        Ok(record)
    }

    fn read(&self, key: &JobKey) -> Result<Option<JobRecord>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        Self::read_record(&conn, key)
    }

    fn mutate(
        &self,
        key: &JobKey,
        f: JobMutation<'_>,
    ) -> Result<Option<JobRecord>, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let current = Self::read_record(&conn, key)?.unwrap_or_default();
        match f(current) {
            Some(updated) => {
                Self::write_record(&conn, key, &updated)?;
                Ok(Some(updated))
            }
            None => Ok(None),
        }
    }

    fn delete(&self, key: &JobKey) -> Result<bool, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let deleted = conn
            .execute("DELETE FROM jobs WHERE job_key = ?", params![key.to_string()])
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(deleted > 0)
    }

    fn list(&self) -> Result<Vec<(JobKey, JobRecord)>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        Self::query_entries(
            &conn,
            "SELECT job_key, record FROM jobs ORDER BY created_at ASC, job_key ASC",
            &[],
        )
    }

    fn list_for_collection(
        &self,
        owner_id: &str,
        collection_id: &str,
    ) -> Result<Vec<(JobKey, JobRecord)>, JobStoreError> {
        let conn = self.conn.lock().unwrap();
        let owner_id = owner_id.to_lowercase();
        Self::query_entries(
            &conn,
            "SELECT job_key, record FROM jobs WHERE owner_id = ? AND collection_id = ? ORDER BY created_at ASC, job_key ASC",
            &[&owner_id as &dyn rusqlite::ToSql, &collection_id],
        )
    }

    fn requeue_pending(&self) -> Result<usize, JobStoreError> {
        let conn = self.conn.lock().unwrap();

        let updated = conn
            .execute(
                r#"
                UPDATE jobs
                SET record = json_set(record, '$.metadata.state', 'waiting'), updated_at = ?
                WHERE json_extract(record, '$.metadata.state') = 'pending'
                "#,
                params![Utc::now().to_rfc3339()],
            )
            .map_err(|e| JobStoreError::Database(e.to_string()))?;

        Ok(updated)
    }
}
