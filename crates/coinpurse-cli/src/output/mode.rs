use crate::cli::{Commands, ImportCommand, RecordsCommand};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

pub fn mode_for_command(command: &Commands) -> OutputMode {
    let json = match command {
        Commands::Import { command } => match command {
            ImportCommand::Run { json, .. }
            | ImportCommand::Fields { json, .. }
            | ImportCommand::List { json } => *json,
        },
        Commands::Records {
            command: RecordsCommand::List { json, .. },
        } => *json,
    };

    if json {
        OutputMode::Json
    } else {
        OutputMode::Text
    }
}
