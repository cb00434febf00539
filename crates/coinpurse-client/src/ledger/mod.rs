//! SQLite-backed record store that import sessions write into.

mod sink;

use std::path::PathBuf;
use std::sync::Mutex;

use rusqlite::{Connection, params};
use serde_json::Value;
use ulid::Ulid;

use crate::contracts::types::{ImportListItem, StoredRecord};
use crate::import::{AnalysisResult, DateFormat, DuplicatePolicy, FieldSet, ImportOutcome, Record};
use crate::setup::SetupContext;
use crate::state::{map_sqlite_error, now_timestamp, open_connection};
use crate::{ClientError, ClientResult};

pub use sink::LedgerSink;

pub struct LedgerStore {
    db_path: PathBuf,
    connection: Mutex<Connection>,
}

/// Columns written when an import run starts.
pub struct NewImportRun<'a> {
    pub entity: &'a str,
    pub file_name: &'a str,
    pub date_format: DateFormat,
    pub duplicate_policy: DuplicatePolicy,
    pub analysis: &'a AnalysisResult,
}

impl LedgerStore {
    pub fn open(setup: &SetupContext) -> ClientResult<Self> {
        let connection = open_connection(&setup.db_path)?;
        Ok(Self {
            db_path: setup.db_path.clone(),
            connection: Mutex::new(connection),
        })
    }

    fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> ClientResult<T> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| ClientError::internal_ledger_lock(&self.db_path))?;
        operation(&connection).map_err(|error| map_sqlite_error(&self.db_path, &error))
    }

    /// Existing records of one entity, oldest first.
    pub fn list_records(&self, entity: &str, fields: &FieldSet) -> ClientResult<Vec<Record>> {
        Ok(self
            .list_stored_records(entity, fields)?
            .into_iter()
            .map(|stored| stored.values)
            .collect())
    }

    pub fn list_stored_records(
        &self,
        entity: &str,
        fields: &FieldSet,
    ) -> ClientResult<Vec<StoredRecord>> {
        let rows = self.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT record_id, import_id, created_at, payload
                 FROM internal_records
                 WHERE entity = ?1
                 ORDER BY rowid ASC",
            )?;
            let rows_iter = statement.query_map(params![entity], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;
            rows_iter.collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let mut records = Vec::with_capacity(rows.len());
        for (record_id, import_id, created_at, payload) in rows {
            let decoded = serde_json::from_str::<Value>(&payload)
                .map_err(|_| ClientError::ledger_corrupt(&self.db_path))?;
            records.push(StoredRecord {
                record_id,
                import_id,
                created_at,
                values: fields.record_from_json(&decoded),
            });
        }
        Ok(records)
    }

    /// Opens an import run in `importing` status and returns its id.
    pub fn begin_import(&self, run: NewImportRun<'_>) -> ClientResult<String> {
        let import_id = format!("imp_{}", Ulid::new());
        let timestamp = now_timestamp();
        let analysis = run.analysis;
        let rows_read = analysis.total_rows() as i64;

        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO internal_import_runs (
                    import_id,
                    entity,
                    status,
                    created_at,
                    file_name,
                    date_format,
                    duplicate_policy,
                    rows_read,
                    rows_valid,
                    rows_duplicate,
                    rows_invalid
                 ) VALUES (?1, ?2, 'importing', ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &import_id,
                    run.entity,
                    &timestamp,
                    run.file_name,
                    run.date_format.as_str(),
                    run.duplicate_policy.as_str(),
                    rows_read,
                    analysis.valid.len() as i64,
                    analysis.duplicates.len() as i64,
                    analysis.invalid.len() as i64,
                ],
            )
        })?;

        Ok(import_id)
    }

    pub fn complete_import(&self, import_id: &str, outcome: &ImportOutcome) -> ClientResult<()> {
        let timestamp = now_timestamp();
        self.with_connection(|connection| {
            connection.execute(
                "UPDATE internal_import_runs
                 SET status = 'completed',
                     completed_at = ?2,
                     imported = ?3,
                     skipped = ?4,
                     failed = ?5,
                     dup_included = ?6
                 WHERE import_id = ?1",
                params![
                    import_id,
                    &timestamp,
                    outcome.imported as i64,
                    outcome.skipped as i64,
                    outcome.failed as i64,
                    outcome.dup_included as i64,
                ],
            )
        })?;
        Ok(())
    }

    pub fn insert_record(&self, import_id: &str, entity: &str, record: &Record) -> ClientResult<String> {
        let record_id = format!("rec_{}", Ulid::new());
        let payload = serde_json::to_string(&record.to_json())
            .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
        let timestamp = now_timestamp();

        self.with_connection(|connection| {
            connection.execute(
                "INSERT INTO internal_records (record_id, import_id, entity, created_at, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![&record_id, import_id, entity, &timestamp, &payload],
            )
        })?;

        Ok(record_id)
    }

    /// All runs, newest first.
    pub fn list_import_runs(&self) -> ClientResult<Vec<ImportListItem>> {
        self.with_connection(|connection| {
            let mut statement = connection.prepare(
                "SELECT
                    import_id,
                    entity,
                    status,
                    created_at,
                    completed_at,
                    file_name,
                    date_format,
                    duplicate_policy,
                    rows_read,
                    rows_valid,
                    rows_duplicate,
                    rows_invalid,
                    imported,
                    skipped,
                    failed,
                    dup_included
                 FROM internal_import_runs
                 ORDER BY CAST(created_at AS INTEGER) DESC, rowid DESC",
            )?;
            let rows_iter = statement.query_map([], |row| {
                Ok(ImportListItem {
                    import_id: row.get(0)?,
                    entity: row.get(1)?,
                    status: row.get(2)?,
                    created_at: row.get(3)?,
                    completed_at: row.get(4)?,
                    file_name: row.get(5)?,
                    date_format: row.get(6)?,
                    duplicate_policy: row.get(7)?,
                    rows_read: row.get(8)?,
                    rows_valid: row.get(9)?,
                    rows_duplicate: row.get(10)?,
                    rows_invalid: row.get(11)?,
                    imported: row.get(12)?,
                    skipped: row.get(13)?,
                    failed: row.get(14)?,
                    dup_included: row.get(15)?,
                })
            })?;
            rows_iter.collect()
        })
    }

    pub fn sink(&self, import_id: &str, entity: &str) -> LedgerSink<'_> {
        LedgerSink::new(self, import_id, entity)
    }
}
