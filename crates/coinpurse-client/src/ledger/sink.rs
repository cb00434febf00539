use async_trait::async_trait;

use crate::import::{ImportSink, Record, SinkError};
use crate::ledger::LedgerStore;

/// Writes each submitted record as one ledger row tagged with the run's id.
pub struct LedgerSink<'a> {
    store: &'a LedgerStore,
    import_id: String,
    entity: String,
}

impl<'a> LedgerSink<'a> {
    pub(crate) fn new(store: &'a LedgerStore, import_id: &str, entity: &str) -> Self {
        Self {
            store,
            import_id: import_id.to_string(),
            entity: entity.to_string(),
        }
    }
}

#[async_trait]
impl<'a> ImportSink for LedgerSink<'a> {
    async fn import(&self, batch: &[Record]) -> Result<(), SinkError> {
        for record in batch {
            self.store
                .insert_record(&self.import_id, &self.entity, record)
                .map_err(|error| SinkError::new(format!("{}: {}", error.code, error.message)))?;
        }
        Ok(())
    }
}
