pub mod amount;
pub mod batch;
pub mod classify;
pub mod coerce;
pub mod date;
pub mod fields;
pub mod input;
pub mod mapping;
pub mod session;
pub mod table;

pub use amount::coerce_amount;
pub use batch::{
    DuplicatePolicy, ImportOutcome, ImportProgress, ImportSink, SinkError, run_batch,
    submit_sequentially,
};
pub use classify::{AnalysisResult, DuplicateRow, IdentityKeyFn, InvalidRow, classify};
pub use coerce::{build_record, build_records, coerce_cell};
pub use date::{DateFormat, coerce_date};
pub use fields::{FieldDefinition, FieldSet, FieldSetError, FieldType, FieldValue, Record};
pub use input::{UploadSource, read_source};
pub use mapping::{ColumnMapping, MappingEntry, MappingError, guess_mapping, normalize_name};
pub use session::{ImportSession, SessionConfig, SessionError, Stage};
pub use table::{ParseError, RawTable, parse_upload};

use crate::contracts::types::{
    ImportDuplicateRow, ImportInvalidRow, ImportMappingItem, ImportNextStep, ImportSummary,
};
use crate::entities::Entity;
use crate::ledger::{LedgerStore, NewImportRun};
use crate::{ClientError, ClientResult};

const PREVIEW_ROWS: usize = 5;

/// `field=column` as given on the command line.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MappingOverride {
    pub field: String,
    pub column: String,
}

impl MappingOverride {
    pub fn parse(value: &str) -> ClientResult<Self> {
        let Some((field, column)) = value.split_once('=') else {
            return Err(ClientError::invalid_argument_for_command(
                &format!("Mapping `{value}` must look like `field=column`."),
                Some("import run"),
            ));
        };
        let field = field.trim();
        let column = column.trim();
        if field.is_empty() || column.is_empty() {
            return Err(ClientError::invalid_argument_for_command(
                &format!("Mapping `{value}` needs both a field and a column."),
                Some("import run"),
            ));
        }
        Ok(Self {
            field: field.to_string(),
            column: column.to_string(),
        })
    }
}

/// Resolves a column given as `-` (unmapped), a 1-based number, or a header
/// name compared case-insensitively.
pub(crate) fn resolve_column(headers: &[String], column: &str) -> ClientResult<Option<usize>> {
    if column == "-" {
        return Ok(None);
    }
    if let Ok(number) = column.parse::<usize>() {
        if number == 0 || number > headers.len() {
            return Err(ClientError::invalid_mapping(&MappingError::ColumnOutOfRange {
                column: number,
                available: headers.len(),
            }));
        }
        return Ok(Some(number - 1));
    }

    let wanted = column.to_lowercase();
    headers
        .iter()
        .position(|header| header.to_lowercase() == wanted)
        .map(Some)
        .ok_or_else(|| ClientError::unknown_column(column, headers))
}

#[derive(Debug)]
pub(crate) struct ImportRequest {
    pub entity: Entity,
    pub source: UploadSource,
    pub mappings: Vec<MappingOverride>,
    pub date_format: DateFormat,
    pub duplicate_policy: DuplicatePolicy,
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct ImportExecutionResult {
    pub import_id: Option<String>,
    pub message: String,
    pub mapping: Vec<ImportMappingItem>,
    pub summary: ImportSummary,
    pub outcome: Option<ImportOutcome>,
    pub invalid_rows: Vec<ImportInvalidRow>,
    pub duplicate_rows: Vec<ImportDuplicateRow>,
    pub preview: Vec<Record>,
    pub next_step: ImportNextStep,
}

/// Drives one session from upload to done against the ledger.
pub(crate) async fn execute(
    store: &LedgerStore,
    request: ImportRequest,
) -> ClientResult<ImportExecutionResult> {
    let entity = request.entity;
    let fields = entity
        .field_set()
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;
    let existing_records = store.list_records(entity.name(), &fields)?;

    let mut session = ImportSession::new(SessionConfig {
        entity_name: entity.display_name().to_string(),
        fields,
        existing_records,
        duplicate_key: entity.identity_key(),
        accent_color: Some(entity.accent_color().to_string()),
    });

    let file_name = request.source.file_name.as_str();
    session
        .upload(file_name, &request.source.content)
        .map_err(|error| match error {
            SessionError::Parse(parse_error) => ClientError::csv_parse_failed(file_name, &parse_error),
            other => other.into(),
        })?;

    let headers = session
        .table()
        .map(|table| table.headers.clone())
        .unwrap_or_default();
    for mapping_override in &request.mappings {
        let column = resolve_column(&headers, &mapping_override.column)?;
        session.set_mapping(&mapping_override.field, column)?;
    }
    session.set_date_format(request.date_format)?;

    if !session.can_analyse() {
        let required = session
            .config()
            .fields
            .required_fields()
            .map(|field| field.key.clone())
            .collect();
        return Err(ClientError::no_required_field_mapped(required, headers));
    }

    let analysis = session.analyse()?.clone();
    session.set_duplicate_policy(request.duplicate_policy)?;

    let summary = ImportSummary {
        rows_read: analysis.total_rows(),
        rows_valid: analysis.valid.len(),
        rows_duplicate: analysis.duplicates.len(),
        rows_invalid: analysis.invalid.len(),
        to_import: session.import_count(),
    };
    let mapping = mapping_items(&session, &headers);
    let preview = session.preview_records(PREVIEW_ROWS)?;
    let invalid_rows = analysis
        .invalid
        .iter()
        .map(|invalid| ImportInvalidRow {
            row: invalid.row,
            reason: invalid.reason.clone(),
        })
        .collect::<Vec<ImportInvalidRow>>();
    let duplicate_rows = analysis
        .duplicates
        .iter()
        .map(|duplicate| ImportDuplicateRow {
            row: duplicate.row,
            record: duplicate.record.clone(),
        })
        .collect::<Vec<ImportDuplicateRow>>();

    if request.dry_run {
        return Ok(ImportExecutionResult {
            import_id: None,
            message: format!(
                "Dry run: {} of {} rows would be imported. No records were written.",
                summary.to_import, summary.rows_read
            ),
            mapping,
            summary,
            outcome: None,
            invalid_rows,
            duplicate_rows,
            preview,
            next_step: ImportNextStep {
                label: "Run the import".to_string(),
                command: format!("coinpurse import run <path> --entity {}", entity.name()),
            },
        });
    }

    if summary.to_import == 0 {
        return Err(ClientError::nothing_to_import(
            summary.rows_duplicate,
            summary.rows_invalid,
        ));
    }

    let import_id = store.begin_import(NewImportRun {
        entity: entity.name(),
        file_name,
        date_format: request.date_format,
        duplicate_policy: request.duplicate_policy,
        analysis: &analysis,
    })?;
    let sink = store.sink(&import_id, entity.name());
    let outcome = session.import(&sink, None).await?;
    store.complete_import(&import_id, &outcome)?;

    Ok(ImportExecutionResult {
        import_id: Some(import_id),
        message: format!(
            "Imported {} of {} records ({} failed).",
            outcome.imported, summary.to_import, outcome.failed
        ),
        mapping,
        summary,
        outcome: Some(outcome),
        invalid_rows,
        duplicate_rows,
        preview,
        next_step: ImportNextStep {
            label: "Review imported records".to_string(),
            command: format!("coinpurse records list {}", entity.name()),
        },
    })
}

fn mapping_items(session: &ImportSession, headers: &[String]) -> Vec<ImportMappingItem> {
    session
        .config()
        .fields
        .fields()
        .iter()
        .map(|field| {
            let column = session
                .mapping()
                .and_then(|mapping| mapping.column_for(&field.key));
            ImportMappingItem {
                field: field.key.clone(),
                label: field.label.clone(),
                required: field.required,
                column: column.map(|index| index + 1),
                header: column.and_then(|index| headers.get(index).cloned()),
            }
        })
        .collect()
}
