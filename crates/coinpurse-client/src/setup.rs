use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::migrations::{
    REQUIRED_INDEX_NAMES, REQUIRED_META_KEYS, run_pending, safe_repair_statement,
};
use crate::state::{
    ensure_ledger_directory, ledger_db_path, map_sqlite_error, open_connection, resolve_ledger_home,
};
use crate::{ClientError, ClientResult};

const INTERNAL_META_COLUMNS: [&str; 2] = ["key", "value"];
const INTERNAL_IMPORT_RUNS_COLUMNS: [&str; 16] = [
    "import_id",
    "entity",
    "status",
    "created_at",
    "completed_at",
    "file_name",
    "date_format",
    "duplicate_policy",
    "rows_read",
    "rows_valid",
    "rows_duplicate",
    "rows_invalid",
    "imported",
    "skipped",
    "failed",
    "dup_included",
];
const INTERNAL_RECORDS_COLUMNS: [&str; 5] =
    ["record_id", "import_id", "entity", "created_at", "payload"];
const EXPECTED_USER_VERSION: i64 = 1;

const REQUIRED_CORE_TABLES: [(&str, &[&str]); 3] = [
    ("internal_meta", &INTERNAL_META_COLUMNS),
    ("internal_import_runs", &INTERNAL_IMPORT_RUNS_COLUMNS),
    ("internal_records", &INTERNAL_RECORDS_COLUMNS),
];

#[derive(Debug, Clone)]
pub struct SetupContext {
    pub db_path: PathBuf,
    pub schema_version: String,
}

pub fn ensure_initialized() -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(Some(home_override))
}

pub(crate) fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<SetupContext> {
    let ledger_home = resolve_ledger_home(home_override)?;
    ensure_ledger_directory(&ledger_home)?;

    let db_path = ledger_db_path(&ledger_home);
    let mut connection = open_connection(&db_path)?;

    run_pending(&mut connection).map_err(|error| map_migration_error(&db_path, &error))?;

    verify_core_tables(&connection, &db_path)?;
    repair_safe_objects(&connection, &db_path)?;
    verify_post_repair_objects(&connection, &db_path)?;

    let schema_version = read_schema_version(&connection, &db_path)?;
    debug!(db_path = %db_path.display(), %schema_version, "ledger ready");

    Ok(SetupContext {
        db_path,
        schema_version,
    })
}

fn map_migration_error(db_path: &Path, error: &rusqlite_migration::Error) -> ClientError {
    match error {
        rusqlite_migration::Error::RusqliteError { query: _, err } => {
            let mapped = map_sqlite_error(db_path, err);
            if mapped.code == "ledger_locked"
                || mapped.code == "ledger_corrupt"
                || mapped.code == "ledger_init_permission_denied"
            {
                mapped
            } else {
                ClientError::migration_failed(db_path, &error.to_string())
            }
        }
        _ => ClientError::migration_failed(db_path, &error.to_string()),
    }
}

fn verify_core_tables(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    for (table_name, required_columns) in REQUIRED_CORE_TABLES {
        if !sqlite_object_exists(connection, "table", table_name, db_path)? {
            return Err(ClientError::ledger_corrupt(db_path));
        }

        let columns = table_columns(connection, table_name, db_path)?;
        if let Some(missing) = required_columns
            .iter()
            .find(|required| !columns.iter().any(|column| column == *required))
        {
            debug!(table = table_name, column = missing, "ledger table is missing a column");
            return Err(ClientError::ledger_corrupt(db_path));
        }
    }

    Ok(())
}

fn repair_safe_objects(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    // Missing meta keys are restored; drifted values are rejected during verification.
    for (meta_key, default_value) in REQUIRED_META_KEYS {
        connection
            .execute(
                "INSERT OR IGNORE INTO internal_meta (key, value) VALUES (?1, ?2)",
                params![meta_key, default_value],
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;
    }

    for index_name in REQUIRED_INDEX_NAMES {
        if sqlite_object_exists(connection, "index", index_name, db_path)? {
            continue;
        }
        let sql = safe_repair_statement(index_name).ok_or_else(|| {
            ClientError::ledger_init_failed(db_path, "Missing canonical SQL for index repair.")
        })?;
        connection
            .execute_batch(&sql)
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        debug!(index = index_name, "recreated ledger index");
    }

    Ok(())
}

fn verify_post_repair_objects(connection: &Connection, db_path: &Path) -> ClientResult<()> {
    let user_version = connection
        .query_row("PRAGMA user_version", [], |row| row.get::<_, i64>(0))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    if user_version != EXPECTED_USER_VERSION {
        return Err(ClientError::ledger_corrupt(db_path));
    }

    for (meta_key, expected_value) in REQUIRED_META_KEYS {
        let value = connection
            .query_row(
                "SELECT value FROM internal_meta WHERE key = ?1 LIMIT 1",
                [meta_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        if value.as_deref() != Some(expected_value) {
            return Err(ClientError::ledger_corrupt(db_path));
        }
    }

    for index_name in REQUIRED_INDEX_NAMES {
        if !sqlite_object_exists(connection, "index", index_name, db_path)? {
            return Err(ClientError::ledger_corrupt(db_path));
        }
    }

    Ok(())
}

fn sqlite_object_exists(
    connection: &Connection,
    object_type: &str,
    object_name: &str,
    db_path: &Path,
) -> ClientResult<bool> {
    let exists = connection
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2 LIMIT 1",
            params![object_type, object_name],
            |_row| Ok(true),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?
        .unwrap_or(false);

    Ok(exists)
}

fn table_columns(
    connection: &Connection,
    table_name: &str,
    db_path: &Path,
) -> ClientResult<Vec<String>> {
    if !REQUIRED_CORE_TABLES
        .iter()
        .any(|(required_name, _)| *required_name == table_name)
    {
        return Err(ClientError::ledger_init_failed(
            db_path,
            "Refused PRAGMA table inspection for non-core table.",
        ));
    }

    // `table_name` comes from REQUIRED_CORE_TABLES only.
    let sql = format!("PRAGMA table_info({table_name})");
    let mut statement = connection
        .prepare(&sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let column_iter = statement
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut columns: Vec<String> = Vec::new();
    for row in column_iter {
        columns.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }

    Ok(columns)
}

fn read_schema_version(connection: &Connection, db_path: &Path) -> ClientResult<String> {
    let value = connection
        .query_row(
            "SELECT value FROM internal_meta WHERE key = 'schema_version' LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    Ok(value.unwrap_or_else(|| "v1".to_string()))
}
