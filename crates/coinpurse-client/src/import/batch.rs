use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::import::fields::Record;

/// Rejection raised by an [`ImportSink`] for one submission.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Where accepted records go. The importer calls it with one record at a time
/// and awaits each call before the next.
#[async_trait]
pub trait ImportSink: Send + Sync {
    async fn import(&self, batch: &[Record]) -> Result<(), SinkError>;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Skip,
    Include,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Include => "include",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "include" => Ok(Self::Include),
            other => Err(format!(
                "`{other}` is not a duplicate policy; use `skip` or `include`."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dup_included: usize,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ImportProgress {
    pub attempted: usize,
    pub total: usize,
}

/// Submits `records` one by one. A rejected record is counted as failed and
/// the loop moves on; nothing is retried.
pub async fn submit_sequentially(
    sink: &dyn ImportSink,
    records: &[Record],
    mut progress: Option<&mut (dyn FnMut(ImportProgress) + Send)>,
) -> (usize, usize) {
    let total = records.len();
    let mut imported = 0;
    let mut failed = 0;

    for (index, record) in records.iter().enumerate() {
        match sink.import(std::slice::from_ref(record)).await {
            Ok(()) => imported += 1,
            Err(error) => {
                failed += 1;
                warn!(record = index + 1, error = %error, "import sink rejected record");
            }
        }

        if let Some(observer) = progress.as_deref_mut() {
            observer(ImportProgress {
                attempted: index + 1,
                total,
            });
        }
    }

    (imported, failed)
}

/// Runs the batch for an analysed session: valid records always, duplicates
/// only under [`DuplicatePolicy::Include`].
pub async fn run_batch(
    sink: &dyn ImportSink,
    valid: &[Record],
    duplicates: &[Record],
    policy: DuplicatePolicy,
    progress: Option<&mut (dyn FnMut(ImportProgress) + Send)>,
) -> ImportOutcome {
    let (to_submit, skipped, dup_included) = match policy {
        DuplicatePolicy::Skip => (valid.to_vec(), duplicates.len(), 0),
        DuplicatePolicy::Include => {
            let mut combined = valid.to_vec();
            combined.extend_from_slice(duplicates);
            (combined, 0, duplicates.len())
        }
    };

    let (imported, failed) = submit_sequentially(sink, &to_submit, progress).await;
    let outcome = ImportOutcome {
        imported,
        skipped,
        failed,
        dup_included,
    };
    info!(
        imported = outcome.imported,
        skipped = outcome.skipped,
        failed = outcome.failed,
        dup_included = outcome.dup_included,
        "import batch finished"
    );
    outcome
}
