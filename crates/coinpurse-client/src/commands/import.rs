use std::path::Path;

use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{ImportData, ImportFieldsData, ImportListData, LedgerContext};
use crate::entities::Entity;
use crate::import::{self, DateFormat, DuplicatePolicy, ImportRequest, MappingOverride};
use crate::ledger::LedgerStore;
use crate::setup::{SetupContext, ensure_initialized_with_home_override};
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct ImportRunOptions<'a> {
    pub path: String,
    pub entity: String,
    pub mappings: Vec<String>,
    pub date_format: Option<String>,
    pub duplicates: Option<String>,
    pub dry_run: bool,
    pub home_override: Option<&'a Path>,
    pub stdin_override: Option<String>,
}

#[derive(Debug, Default)]
pub struct ImportListOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub async fn run(options: ImportRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    run_with_options(options).await
}

#[doc(hidden)]
pub async fn run_with_options(options: ImportRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let entity = Entity::parse(&options.entity)?;
    let date_format = parse_date_format(options.date_format.as_deref())?;
    let duplicate_policy = parse_duplicate_policy(options.duplicates.as_deref())?;
    let mappings = options
        .mappings
        .iter()
        .map(|value| MappingOverride::parse(value))
        .collect::<ClientResult<Vec<MappingOverride>>>()?;

    let source = import::read_source(&options.path, options.stdin_override).await?;
    let file_name = source.file_name.clone();

    let setup = load_setup(options.home_override)?;
    let store = LedgerStore::open(&setup)?;
    let execution = import::execute(
        &store,
        ImportRequest {
            entity,
            source,
            mappings,
            date_format,
            duplicate_policy,
            dry_run: options.dry_run,
        },
    )
    .await?;

    let data = ImportData {
        dry_run: options.dry_run,
        entity: entity.name().to_string(),
        file_name,
        import_id: execution.import_id,
        message: execution.message,
        date_format,
        duplicate_policy,
        mapping: execution.mapping,
        summary: execution.summary,
        outcome: execution.outcome,
        invalid_rows: execution.invalid_rows,
        duplicate_rows: execution.duplicate_rows,
        preview: execution.preview,
        next_step: execution.next_step,
        ledger: ledger_context(&setup),
    };

    success("import run", data)
}

pub fn fields(entity: &str) -> ClientResult<SuccessEnvelope> {
    let entity = Entity::parse(entity)?;
    let field_set = entity
        .field_set()
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;

    success(
        "import fields",
        ImportFieldsData {
            entity: entity.name().to_string(),
            display_name: entity.display_name().to_string(),
            accent_color: entity.accent_color().to_string(),
            duplicate_detection: entity.identity_key().is_some(),
            fields: field_set.fields().to_vec(),
            date_formats: DateFormat::ALL.to_vec(),
        },
    )
}

pub fn list() -> ClientResult<SuccessEnvelope> {
    list_with_options(ImportListOptions {
        home_override: None,
    })
}

#[doc(hidden)]
pub fn list_with_options(options: ImportListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let setup = load_setup(options.home_override)?;
    let store = LedgerStore::open(&setup)?;
    let rows = store.list_import_runs()?;
    success("import list", ImportListData { rows })
}

pub(crate) fn load_setup(home_override: Option<&Path>) -> ClientResult<SetupContext> {
    ensure_initialized_with_home_override(home_override)
}

pub(crate) fn ledger_context(setup: &SetupContext) -> LedgerContext {
    LedgerContext {
        db_path: setup.db_path.display().to_string(),
        schema_version: setup.schema_version.clone(),
    }
}

fn parse_date_format(value: Option<&str>) -> ClientResult<DateFormat> {
    let Some(raw) = value else {
        return Ok(DateFormat::Auto);
    };
    raw.parse::<DateFormat>().map_err(|message| {
        ClientError::invalid_argument_with_recovery(
            &message,
            vec![format!(
                "Use one of: {}.",
                DateFormat::ALL
                    .iter()
                    .map(DateFormat::as_str)
                    .collect::<Vec<&str>>()
                    .join(", ")
            )],
        )
    })
}

fn parse_duplicate_policy(value: Option<&str>) -> ClientResult<DuplicatePolicy> {
    let Some(raw) = value else {
        return Ok(DuplicatePolicy::default());
    };
    raw.parse::<DuplicatePolicy>().map_err(|message| {
        ClientError::invalid_argument_with_recovery(
            &message,
            vec!["Pass `--duplicates skip` or `--duplicates include`.".to_string()],
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{fields, parse_date_format, parse_duplicate_policy};
    use crate::import::{DateFormat, DuplicatePolicy};

    #[test]
    fn flags_default_to_auto_and_skip() {
        assert!(matches!(parse_date_format(None), Ok(DateFormat::Auto)));
        assert!(matches!(
            parse_duplicate_policy(None),
            Ok(DuplicatePolicy::Skip)
        ));
    }

    #[test]
    fn bad_flag_values_are_invalid_arguments() {
        let date_format = parse_date_format(Some("someday"));
        assert!(date_format.is_err());
        if let Err(error) = date_format {
            assert_eq!(error.code, "invalid_argument");
        }
        assert!(parse_duplicate_policy(Some("merge")).is_err());
    }

    #[test]
    fn fields_command_describes_the_preset() {
        let envelope = fields("Income");
        assert!(envelope.is_ok());
        if let Ok(envelope) = envelope {
            assert_eq!(envelope.command, "import fields");
            assert_eq!(envelope.data["entity"], "income");
            assert_eq!(envelope.data["fields"][2]["key"], "source");
            assert_eq!(envelope.data["fields"][2]["required"], true);
            assert_eq!(envelope.data["duplicate_detection"], true);
        }
    }
}
