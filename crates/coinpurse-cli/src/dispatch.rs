use coinpurse_client::commands;
use coinpurse_client::commands::import::ImportRunOptions;
use coinpurse_client::{ClientError, ClientResult, SuccessEnvelope};
use tokio::runtime::Builder;

use crate::cli::{Cli, Commands, ImportCommand, RecordsCommand};

pub fn dispatch(cli: &Cli) -> ClientResult<SuccessEnvelope> {
    match &cli.command {
        Commands::Import { command } => match command {
            ImportCommand::Run {
                path,
                entity,
                mappings,
                date_format,
                duplicates,
                dry_run,
                json: _,
            } => block_on_import(ImportRunOptions {
                path: path.clone(),
                entity: entity.clone(),
                mappings: mappings.clone(),
                date_format: date_format.clone(),
                duplicates: duplicates.clone(),
                dry_run: *dry_run,
                ..ImportRunOptions::default()
            }),
            ImportCommand::Fields { entity, .. } => commands::import::fields(entity),
            ImportCommand::List { .. } => commands::import::list(),
        },
        Commands::Records { command } => match command {
            RecordsCommand::List { entity, .. } => commands::records::list(entity),
        },
    }
}

// The sink is awaited one record at a time, so one thread is enough.
fn block_on_import(options: ImportRunOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| ClientError::internal_runtime(&error.to_string()))?;
    runtime.block_on(commands::import::run(options))
}
