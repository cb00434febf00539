use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("`{file_name}` is not a .csv file.")]
    UnsupportedExtension { file_name: String },
    #[error("The CSV needs a header row and at least one data row.")]
    TooFewRows,
    #[error("The CSV header row is empty.")]
    EmptyHeader,
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension { .. } => "csv_unsupported_extension",
            Self::TooFewRows => "csv_too_few_rows",
            Self::EmptyHeader => "csv_empty_header",
        }
    }
}

/// Parsed CSV: one header row plus data rows, every cell trimmed.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cell text, or `""` when the row is shorter than `column`.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

pub fn parse_upload(file_name: &str, content: &str) -> Result<RawTable, ParseError> {
    if !file_name.trim().to_ascii_lowercase().ends_with(".csv") {
        return Err(ParseError::UnsupportedExtension {
            file_name: file_name.to_string(),
        });
    }

    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let (Some(header_line), Some(first_data_line)) = (lines.next(), lines.next()) else {
        return Err(ParseError::TooFewRows);
    };

    let headers = split_line(header_line);
    if headers.iter().all(String::is_empty) {
        return Err(ParseError::EmptyHeader);
    }

    let rows = std::iter::once(first_data_line)
        .chain(lines)
        .map(split_line)
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect::<Vec<Vec<String>>>();

    debug!(
        columns = headers.len(),
        rows = rows.len(),
        "parsed csv upload"
    );

    Ok(RawTable { headers, rows })
}

/// Splits one line into trimmed cells. `"` toggles quoting wherever it
/// appears, `""` inside quotes is a literal quote, and only an unquoted `,`
/// ends a cell. A quote left open runs to the end of the line.
fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(character) = chars.next() {
        match character {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current).trim().to_string()),
            other => current.push(other),
        }
    }
    cells.push(current.trim().to_string());
    cells
}
