use clap::{Parser, Subcommand};

/// Extended help shown after `coinpurse import run --help`.
pub const IMPORT_RUN_AFTER_HELP: &str = "\
How import works:
  One run reads one CSV file, matches its columns to the entity's fields,
  converts every cell, then splits the rows into new, duplicate and invalid.
  Only new rows are written unless `--duplicates include` is passed.

  <path> is a local `.csv` file with a header row.
  To read stdin explicitly, use `-` as the path.
  Example: cat march.csv | coinpurse import run - --entity expenses --dry-run

Column mapping:
  Columns are matched to fields by name (case and punctuation are ignored).
  Override any field with `--map field=column`, where column is
    a header name         --map title=Description
    a 1-based number      --map amount=3
    `-` to leave unmapped --map category=-
  Run `coinpurse import fields <entity>` to list the field keys.

Dates:
  `--date-format auto` (the default) tries ISO dates first, then numeric
  dates, then dates with month names. A numeric date such as 03/04/2024 is
  read month-first unless its first number is above 12. Pass an explicit
  format when your file is day-first:
    YYYY-MM-DD, MM/DD/YYYY, DD/MM/YYYY, MM-DD-YYYY, DD-MM-YYYY,
    YYYY/MM/DD, D MMM YYYY, MMM D YYYY

Amounts:
  Currency symbols and spaces are ignored. `1,234.56` and `1.234,56` both
  read as 1234.56.

What to do next:
  1. Run `coinpurse import run <path> --entity <name> --dry-run` and review the result.
  2. Fix the mapping or date format if rows show up as invalid.
  3. Run the same command without `--dry-run` to write the records.
";

#[derive(Debug, Parser)]
#[command(
    name = "coinpurse",
    version,
    about = "CSV import pipeline for a personal finance tracker",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Import CSV files and inspect past imports
    #[command(arg_required_else_help = true)]
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
    /// Inspect stored records
    #[command(arg_required_else_help = true)]
    Records {
        #[command(subcommand)]
        command: RecordsCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImportCommand {
    /// Run one import session: parse, map, analyse, then write new rows
    #[command(after_long_help = IMPORT_RUN_AFTER_HELP)]
    Run {
        /// Path to a `.csv` file (use `-` for stdin)
        path: String,
        /// Entity to import into (expenses, income, loans, bank, savings, notes)
        #[arg(long)]
        entity: String,
        /// Map a field to a column: `field=header`, `field=<1-based number>` or `field=-`
        #[arg(long = "map", value_name = "FIELD=COLUMN")]
        mappings: Vec<String>,
        /// Date format for date columns (default: auto)
        #[arg(long)]
        date_format: Option<String>,
        /// What to do with rows matching existing records: skip or include
        #[arg(long)]
        duplicates: Option<String>,
        /// Analyse the file without writing to the ledger
        #[arg(long)]
        dry_run: bool,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show the fields an entity accepts
    Fields {
        /// Entity name
        entity: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// List past imports, newest first
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RecordsCommand {
    /// List stored records of one entity, oldest first
    List {
        /// Entity name
        entity: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
