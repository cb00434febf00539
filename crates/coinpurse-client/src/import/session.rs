use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::import::batch::{DuplicatePolicy, ImportOutcome, ImportProgress, ImportSink, run_batch};
use crate::import::classify::{AnalysisResult, IdentityKeyFn, classify};
use crate::import::coerce::{build_record, build_records};
use crate::import::date::DateFormat;
use crate::import::fields::{FieldSet, Record};
use crate::import::mapping::{ColumnMapping, MappingError, guess_mapping};
use crate::import::table::{ParseError, RawTable, parse_upload};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Upload,
    Map,
    Review,
    Importing,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Map => "map",
            Self::Review => "review",
            Self::Importing => "importing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("This step needs the `{expected}` stage, but the session is at `{actual}`.")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("The session cannot step back from the `{stage}` stage; only `map` and `review` can.")]
    CannotGoBack { stage: Stage },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Map at least one required field to a column before analysing.")]
    NoRequiredFieldMapped,
    #[error("There are no records to import.")]
    NothingToImport,
}

/// Everything a caller hands over when a session starts.
#[derive(Clone)]
pub struct SessionConfig {
    pub entity_name: String,
    pub fields: FieldSet,
    pub existing_records: Vec<Record>,
    pub duplicate_key: Option<Arc<IdentityKeyFn>>,
    /// Presentation only; never read by the pipeline.
    pub accent_color: Option<String>,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("entity_name", &self.entity_name)
            .field("fields", &self.fields)
            .field("existing_records", &self.existing_records.len())
            .field("duplicate_key", &self.duplicate_key.is_some())
            .field("accent_color", &self.accent_color)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    stage: Stage,
    file_name: Option<String>,
    parse_error: Option<ParseError>,
    table: Option<RawTable>,
    mapping: Option<ColumnMapping>,
    date_format: DateFormat,
    analysis: Option<AnalysisResult>,
    duplicate_policy: DuplicatePolicy,
    outcome: Option<ImportOutcome>,
}

/// One run of the import wizard: `Upload → Map → Review → Importing → Done`.
#[derive(Debug, Clone)]
pub struct ImportSession {
    config: SessionConfig,
    state: SessionState,
}

impl ImportSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::default(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.state.stage
    }

    pub fn file_name(&self) -> Option<&str> {
        self.state.file_name.as_deref()
    }

    /// Last upload failure, kept until the next successful upload.
    pub fn parse_error(&self) -> Option<&ParseError> {
        self.state.parse_error.as_ref()
    }

    pub fn table(&self) -> Option<&RawTable> {
        self.state.table.as_ref()
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        self.state.mapping.as_ref()
    }

    pub fn date_format(&self) -> DateFormat {
        self.state.date_format
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.state.analysis.as_ref()
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.state.duplicate_policy
    }

    pub fn outcome(&self) -> Option<&ImportOutcome> {
        self.state.outcome.as_ref()
    }

    pub fn upload(&mut self, file_name: &str, content: &str) -> Result<(), SessionError> {
        self.require_stage(Stage::Upload)?;
        self.state.file_name = Some(file_name.to_string());

        let table = match parse_upload(file_name, content) {
            Ok(table) => table,
            Err(error) => {
                self.state.parse_error = Some(error.clone());
                return Err(SessionError::Parse(error));
            }
        };

        let mapping = guess_mapping(&table.headers, &self.config.fields);
        debug!(
            entity = %self.config.entity_name,
            mapping = ?mapping.entries(),
            "guessed column mapping"
        );

        self.state.parse_error = None;
        self.state.table = Some(table);
        self.state.mapping = Some(mapping);
        self.state.stage = Stage::Map;
        Ok(())
    }

    pub fn set_mapping(&mut self, field_key: &str, column: Option<usize>) -> Result<(), SessionError> {
        self.require_stage(Stage::Map)?;
        let Some(mapping) = self.state.mapping.as_mut() else {
            return Err(self.wrong_stage(Stage::Map));
        };
        mapping.set(field_key, column)?;
        Ok(())
    }

    pub fn set_date_format(&mut self, date_format: DateFormat) -> Result<(), SessionError> {
        self.require_stage(Stage::Map)?;
        self.state.date_format = date_format;
        Ok(())
    }

    /// The first `limit` rows coerced with the current mapping and date format.
    pub fn preview_records(&self, limit: usize) -> Result<Vec<Record>, SessionError> {
        let (table, mapping) = self.table_and_mapping()?;
        Ok((0..table.row_count().min(limit))
            .map(|row| {
                build_record(
                    table,
                    row,
                    &self.config.fields,
                    mapping,
                    self.state.date_format,
                )
            })
            .collect())
    }

    pub fn can_analyse(&self) -> bool {
        self.state.stage == Stage::Map && self.any_required_field_mapped()
    }

    pub fn analyse(&mut self) -> Result<&AnalysisResult, SessionError> {
        self.require_stage(Stage::Map)?;
        if !self.any_required_field_mapped() {
            return Err(SessionError::NoRequiredFieldMapped);
        }

        let (table, mapping) = self.table_and_mapping()?;
        let records = build_records(table, &self.config.fields, mapping, self.state.date_format);
        let analysis = classify(
            records,
            &self.config.fields,
            &self.config.existing_records,
            self.config.duplicate_key.as_deref(),
        );

        self.state.stage = Stage::Review;
        Ok(self.state.analysis.insert(analysis))
    }

    /// Steps back one stage. Leaving Map drops the table and mapping but keeps
    /// the file name; leaving Review drops the analysis.
    pub fn back(&mut self) -> Result<Stage, SessionError> {
        match self.state.stage {
            Stage::Map => {
                self.state.table = None;
                self.state.mapping = None;
                self.state.analysis = None;
                self.state.stage = Stage::Upload;
            }
            Stage::Review => {
                self.state.analysis = None;
                self.state.stage = Stage::Map;
            }
            Stage::Upload | Stage::Importing | Stage::Done => {
                return Err(SessionError::CannotGoBack {
                    stage: self.state.stage,
                });
            }
        }
        Ok(self.state.stage)
    }

    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) -> Result<(), SessionError> {
        self.require_stage(Stage::Review)?;
        self.state.duplicate_policy = policy;
        Ok(())
    }

    /// Records that an import would submit under the current policy.
    pub fn import_count(&self) -> usize {
        let Some(analysis) = self.state.analysis.as_ref() else {
            return 0;
        };
        match self.state.duplicate_policy {
            DuplicatePolicy::Skip => analysis.valid.len(),
            DuplicatePolicy::Include => analysis.valid.len() + analysis.duplicates.len(),
        }
    }

    pub async fn import(
        &mut self,
        sink: &dyn ImportSink,
        progress: Option<&mut (dyn FnMut(ImportProgress) + Send)>,
    ) -> Result<ImportOutcome, SessionError> {
        self.require_stage(Stage::Review)?;
        if self.import_count() == 0 {
            return Err(SessionError::NothingToImport);
        }
        let Some(analysis) = self.state.analysis.as_ref() else {
            return Err(SessionError::NothingToImport);
        };

        let valid = analysis.valid.clone();
        let duplicates = analysis
            .duplicates
            .iter()
            .map(|duplicate| duplicate.record.clone())
            .collect::<Vec<Record>>();
        let policy = self.state.duplicate_policy;

        self.state.stage = Stage::Importing;
        let outcome = run_batch(sink, &valid, &duplicates, policy, progress).await;
        self.state.outcome = Some(outcome);
        self.state.stage = Stage::Done;
        Ok(outcome)
    }

    /// Back to a fresh Upload stage with the same configuration.
    pub fn reset(&mut self) {
        self.state = SessionState::default();
    }

    fn any_required_field_mapped(&self) -> bool {
        let Some(mapping) = self.state.mapping.as_ref() else {
            return false;
        };
        self.config
            .fields
            .required_fields()
            .any(|field| mapping.is_mapped(&field.key))
    }

    fn table_and_mapping(&self) -> Result<(&RawTable, &ColumnMapping), SessionError> {
        match (self.state.table.as_ref(), self.state.mapping.as_ref()) {
            (Some(table), Some(mapping)) => Ok((table, mapping)),
            _ => Err(self.wrong_stage(Stage::Map)),
        }
    }

    fn require_stage(&self, expected: Stage) -> Result<(), SessionError> {
        if self.state.stage == expected {
            Ok(())
        } else {
            Err(self.wrong_stage(expected))
        }
    }

    fn wrong_stage(&self, expected: Stage) -> SessionError {
        SessionError::WrongStage {
            expected,
            actual: self.state.stage,
        }
    }
}
