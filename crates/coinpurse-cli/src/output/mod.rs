mod error_text;
mod format;
mod import_text;
mod json;
mod mode;
mod records_text;

use std::io;

use coinpurse_client::{ClientError, SuccessEnvelope};

use crate::stdout_io::write_stdout_line;

pub use mode::{OutputMode, mode_for_command};

pub fn print_success(success: &SuccessEnvelope, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Text => render_text_success(success)?,
        OutputMode::Json => json::render_success_json(success)?,
    };
    write_stdout_line(&body)
}

pub fn print_failure(error: &ClientError, mode: OutputMode) -> io::Result<()> {
    let body = match mode {
        OutputMode::Json => json::render_error_json(error)?,
        OutputMode::Text => error_text::render_error(error),
    };
    write_stdout_line(&body)
}

fn render_text_success(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "import run" => import_text::render_import_run(&success.data),
        "import fields" => import_text::render_import_fields(&success.data),
        "import list" => import_text::render_import_list(&success.data),
        "records list" => records_text::render_records_list(&success.data),
        _ => Err(io::Error::other(format!(
            "unsupported text output command `{}`",
            success.command
        ))),
    }
}
