mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use coinpurse_client::ClientError;
use stdout_io::write_stdout_text;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "COINPURSE_LOG";

const ROOT_HELP: &str = "Coinpurse - CSV import pipeline for a personal finance tracker

Usage:
  coinpurse <command>

Start here:
  coinpurse import fields expenses
  coinpurse import run --help
";

const TOP_LEVEL_HELP: &str = "Coinpurse - CSV import pipeline for a personal finance tracker

USAGE: coinpurse <command>

Import a CSV file:
  1. coinpurse import fields <entity>                       See which fields an entity accepts
  2. coinpurse import run <path> --entity <entity> --dry-run  Check mapping, dates and duplicates
  3. coinpurse import run <path> --entity <entity>          Write the new rows

Look at what is stored:
  coinpurse import list                                     List past imports, newest first
  coinpurse records list <entity>                           List stored records

Entities: expenses, income, loans, bank, savings, notes

Environment:
  COINPURSE_HOME   Ledger directory (default: ~/.coinpurse)
  COINPURSE_LOG    Log filter for stderr, e.g. `info` or `coinpurse_client=debug` (default: warn)
  COLUMNS          Width used for text tables

Run `coinpurse <command> --help` for command usage.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let text = if is_top_level_help_request(&raw_args) {
                    TOP_LEVEL_HELP.to_string()
                } else {
                    err.to_string()
                };
                if write_stdout_text(&text).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            if err.kind() == ErrorKind::DisplayVersion {
                if write_stdout_text(&err.to_string()).is_err() {
                    return Err(ExitCode::from(2));
                }
                return Ok(ExitCode::SUCCESS);
            }
            let command_hint = if matches!(
                err.kind(),
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
            ) {
                command_path_from_args(&raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(&raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            return Err(ExitCode::from(1));
        }
    };
    let mode = output::mode_for_command(&cli.command);
    debug!(?mode, "dispatching command");

    match dispatch::dispatch(&cli) {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Strips clap's trailing usage and "For more information" lines so the
/// recovery steps are the only guidance printed.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Subcommand path (e.g. "import run") for help hints, ignoring flags and
/// their values.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let words: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match words.as_slice() {
        ["import", "run", ..] => "import run",
        ["import", "fields", ..] => "import fields",
        ["import", "list", ..] => "import list",
        ["import", ..] => "import",
        ["records", "list", ..] => "records list",
        ["records", ..] => "records",
        _ => return None,
    };
    Some(hint.to_string())
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if error.is_internal() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}
