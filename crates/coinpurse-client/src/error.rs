use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

use crate::import::{MappingError, ParseError, SessionError};

pub(crate) const IMPORT_HELP_COMMAND: &str = "coinpurse import run --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Ledger and serialization failures; everything else is the caller's to fix.
    pub fn is_internal(&self) -> bool {
        self.code.starts_with("internal_")
            || matches!(
                self.code.as_str(),
                "ledger_init_permission_denied"
                    | "ledger_locked"
                    | "ledger_corrupt"
                    | "migration_failed"
                    | "ledger_init_failed"
            )
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `coinpurse {cmd} --help` for usage."),
            None => "Run `coinpurse --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn unknown_entity(name: &str, known: &[&str]) -> Self {
        Self::new(
            "unknown_entity",
            &format!("`{name}` is not an importable entity."),
            vec![
                format!("Use one of: {}.", known.join(", ")),
                "Run `coinpurse import fields <entity>` to inspect an entity's fields.".to_string(),
            ],
        )
        .with_data(json!({
            "entity": name,
            "known_entities": known,
        }))
    }

    pub fn import_source_unreadable(source: &str, detail: &str) -> Self {
        Self::invalid_argument_with_recovery(
            &format!("Could not read import source `{source}`: {detail}"),
            vec![
                "Verify the path exists and is readable.".to_string(),
                "Pass `-` to read the CSV from stdin.".to_string(),
            ],
        )
    }

    pub fn csv_parse_failed(file_name: &str, error: &ParseError) -> Self {
        Self::new(
            error.code(),
            &error.to_string(),
            vec![
                "Export the data as a comma-separated .csv file with a header row.".to_string(),
                format!("Run `{IMPORT_HELP_COMMAND}` for the expected file format."),
            ],
        )
        .with_data(json!({
            "file_name": file_name,
        }))
    }

    pub fn invalid_mapping(error: &MappingError) -> Self {
        Self::new(
            "invalid_mapping",
            &error.to_string(),
            vec![
                "Use `--map field=column` with a field key from `coinpurse import fields <entity>`."
                    .to_string(),
                "Columns are header names, 1-based column numbers, or `-` for unmapped."
                    .to_string(),
            ],
        )
    }

    pub fn unknown_column(column: &str, headers: &[String]) -> Self {
        Self::new(
            "unknown_column",
            &format!("The CSV has no column named `{column}`."),
            vec![
                format!("Use one of the headers: {}.", headers.join(", ")),
                "Or give a 1-based column number.".to_string(),
            ],
        )
        .with_data(json!({
            "column": column,
            "headers": headers,
        }))
    }

    pub fn no_required_field_mapped(required_fields: Vec<String>, headers: Vec<String>) -> Self {
        Self::new(
            "no_required_field_mapped",
            "None of the required fields could be matched to a CSV column.",
            vec![
                "Rename the CSV headers to match the field labels.".to_string(),
                "Or map columns explicitly with `--map field=column`.".to_string(),
            ],
        )
        .with_data(json!({
            "required_fields": required_fields,
            "headers": headers,
        }))
    }

    pub fn nothing_to_import(rows_duplicate: usize, rows_invalid: usize) -> Self {
        Self::new(
            "nothing_to_import",
            "No rows are ready to import.",
            vec![
                "Fix the invalid rows listed by `--dry-run` and rerun.".to_string(),
                "Pass `--duplicates include` to import rows that match existing records."
                    .to_string(),
            ],
        )
        .with_data(json!({
            "rows_duplicate": rows_duplicate,
            "rows_invalid": rows_invalid,
        }))
    }

    pub fn import_session_out_of_order(message: &str) -> Self {
        Self::new("internal_session_stage", message, Vec::new())
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn internal_runtime(detail: &str) -> Self {
        Self::new(
            "internal_runtime",
            &format!("Could not start the async runtime: {detail}"),
            vec!["Rerun the command.".to_string()],
        )
    }

    pub fn internal_ledger_lock(path: &Path) -> Self {
        Self::new(
            "internal_ledger_lock",
            &format!(
                "Ledger connection for `{}` is unusable after an earlier failure.",
                path.display()
            ),
            vec!["Rerun the command.".to_string()],
        )
    }

    pub fn ledger_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_permission_denied",
            &format!("Cannot initialize ledger at `{location}`: {detail}"),
            vec![format!(
                "Grant write access to `{location}` or set `COINPURSE_HOME` to a writable directory."
            )],
        )
    }

    pub fn ledger_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_locked",
            &format!("Ledger database is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn ledger_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_corrupt",
            &format!("Ledger database appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid coinpurse ledger or restore it from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Ledger migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn ledger_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "ledger_init_failed",
            &format!("Ledger initialization failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

impl From<SessionError> for ClientError {
    fn from(error: SessionError) -> Self {
        match &error {
            SessionError::Parse(parse_error) => Self::csv_parse_failed("", parse_error),
            SessionError::Mapping(mapping_error) => Self::invalid_mapping(mapping_error),
            SessionError::NoRequiredFieldMapped => {
                Self::no_required_field_mapped(Vec::new(), Vec::new())
            }
            SessionError::NothingToImport => Self::nothing_to_import(0, 0),
            SessionError::WrongStage { .. } | SessionError::CannotGoBack { .. } => {
                Self::import_session_out_of_order(&error.to_string())
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
