use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, Error as SqliteError, ffi::ErrorCode};

use crate::{ClientError, ClientResult};

pub const HOME_ENV_VAR: &str = "COINPURSE_HOME";

pub fn resolve_ledger_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os(HOME_ENV_VAR) {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".coinpurse")
            } else {
                return Err(ClientError::ledger_init_failed(
                    Path::new("."),
                    "Could not resolve a home directory for ledger initialization.",
                ));
            }
        }
    };

    absolutize(&candidate)
}

pub fn ensure_ledger_directory(path: &Path) -> ClientResult<()> {
    fs::create_dir_all(path).map_err(|error| map_io_error(path, &error))?;
    set_private_permissions_best_effort(path);
    Ok(())
}

pub fn ledger_db_path(home: &Path) -> PathBuf {
    home.join("ledger.db")
}

pub fn open_connection(db_path: &Path) -> ClientResult<Connection> {
    let connection =
        Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .busy_timeout(Duration::from_millis(250))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(connection)
}

/// Seconds since the Unix epoch, as stored in `created_at` columns.
pub(crate) fn now_timestamp() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs().to_string(),
        Err(_) => "0".to_string(),
    }
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return ClientError::ledger_init_permission_denied(path, &error.to_string());
    }

    ClientError::ledger_init_failed(path, &error.to_string())
}

pub fn map_sqlite_error(path: &Path, error: &SqliteError) -> ClientError {
    let error_code = error.sqlite_error_code();

    if matches!(
        error_code,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    ) {
        return ClientError::ledger_locked(path);
    }

    if matches!(error_code, Some(ErrorCode::NotADatabase)) {
        return ClientError::ledger_corrupt(path);
    }

    if matches!(
        error_code,
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly)
    ) {
        return ClientError::ledger_init_permission_denied(path, &error.to_string());
    }

    ClientError::ledger_init_failed(path, &error.to_string())
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::ledger_init_failed(path, &error.to_string()))
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rusqlite::ffi;

    use super::{ledger_db_path, map_sqlite_error, now_timestamp, resolve_ledger_home};

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn explicit_home_wins_and_is_made_absolute() {
        let resolved = resolve_ledger_home(Some(Path::new("ledger-home")));
        assert!(resolved.is_ok());
        if let Ok(path) = resolved {
            assert!(path.is_absolute());
            assert!(path.ends_with("ledger-home"));
            assert!(ledger_db_path(&path).ends_with("ledger-home/ledger.db"));
        }
    }

    #[test]
    fn sqlite_errors_map_to_ledger_codes() {
        let path = Path::new("/tmp/ledger.db");
        assert_eq!(
            map_sqlite_error(path, &sqlite_failure(ffi::SQLITE_BUSY)).code,
            "ledger_locked"
        );
        assert_eq!(
            map_sqlite_error(path, &sqlite_failure(ffi::SQLITE_NOTADB)).code,
            "ledger_corrupt"
        );
        assert_eq!(
            map_sqlite_error(path, &sqlite_failure(ffi::SQLITE_READONLY)).code,
            "ledger_init_permission_denied"
        );
        assert_eq!(
            map_sqlite_error(path, &sqlite_failure(ffi::SQLITE_FULL)).code,
            "ledger_init_failed"
        );
    }

    #[test]
    fn timestamps_are_epoch_seconds() {
        let timestamp = now_timestamp();
        assert!(timestamp.parse::<u64>().is_ok());
    }
}
