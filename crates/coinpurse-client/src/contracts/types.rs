use serde::Serialize;

use crate::import::{DateFormat, DuplicatePolicy, FieldDefinition, ImportOutcome, Record};

#[derive(Debug, Clone, Serialize)]
pub struct LedgerContext {
    pub db_path: String,
    pub schema_version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportData {
    pub dry_run: bool,
    pub entity: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_id: Option<String>,
    pub message: String,
    pub date_format: DateFormat,
    pub duplicate_policy: DuplicatePolicy,
    pub mapping: Vec<ImportMappingItem>,
    pub summary: ImportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ImportOutcome>,
    pub invalid_rows: Vec<ImportInvalidRow>,
    pub duplicate_rows: Vec<ImportDuplicateRow>,
    pub preview: Vec<Record>,
    pub next_step: ImportNextStep,
    pub ledger: LedgerContext,
}

/// One field and the column it reads from. `column` is 1-based.
#[derive(Debug, Clone, Serialize)]
pub struct ImportMappingItem {
    pub field: String,
    pub label: String,
    pub required: bool,
    pub column: Option<usize>,
    pub header: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImportSummary {
    pub rows_read: usize,
    pub rows_valid: usize,
    pub rows_duplicate: usize,
    pub rows_invalid: usize,
    pub to_import: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportInvalidRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportDuplicateRow {
    pub row: usize,
    pub record: Record,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportNextStep {
    pub label: String,
    pub command: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFieldsData {
    pub entity: String,
    pub display_name: String,
    pub accent_color: String,
    pub duplicate_detection: bool,
    pub fields: Vec<FieldDefinition>,
    pub date_formats: Vec<DateFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListItem {
    pub import_id: String,
    pub entity: String,
    pub status: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub file_name: String,
    pub date_format: String,
    pub duplicate_policy: String,
    pub rows_read: i64,
    pub rows_valid: i64,
    pub rows_duplicate: i64,
    pub rows_invalid: i64,
    pub imported: i64,
    pub skipped: i64,
    pub failed: i64,
    pub dup_included: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportListData {
    pub rows: Vec<ImportListItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredRecord {
    pub record_id: String,
    pub import_id: String,
    pub created_at: String,
    pub values: Record,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsListData {
    pub entity: String,
    pub columns: Vec<String>,
    pub total: usize,
    pub rows: Vec<StoredRecord>,
}
