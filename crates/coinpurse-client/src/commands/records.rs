use std::path::Path;

use crate::commands::import::load_setup;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::RecordsListData;
use crate::entities::Entity;
use crate::ledger::LedgerStore;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct RecordsListOptions<'a> {
    pub home_override: Option<&'a Path>,
}

pub fn list(entity: &str) -> ClientResult<SuccessEnvelope> {
    list_with_options(
        entity,
        RecordsListOptions {
            home_override: None,
        },
    )
}

#[doc(hidden)]
pub fn list_with_options(
    entity: &str,
    options: RecordsListOptions<'_>,
) -> ClientResult<SuccessEnvelope> {
    let entity = Entity::parse(entity)?;
    let fields = entity
        .field_set()
        .map_err(|error| ClientError::internal_serialization(&error.to_string()))?;

    let setup = load_setup(options.home_override)?;
    let store = LedgerStore::open(&setup)?;
    let rows = store.list_stored_records(entity.name(), &fields)?;

    success(
        "records list",
        RecordsListData {
            entity: entity.name().to_string(),
            columns: fields.fields().iter().map(|field| field.key.clone()).collect(),
            total: rows.len(),
            rows,
        },
    )
}
