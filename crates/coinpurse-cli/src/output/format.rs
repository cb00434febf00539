use std::cmp;

use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub align: Align,
}

impl Column {
    pub fn left(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            align: Align::Left,
        }
    }

    pub fn right(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            align: Align::Right,
        }
    }
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const MIN_COLUMN_WIDTH: usize = 6;
const DEFAULT_WIDTH: usize = 100;
const MIN_WIDTH: usize = 40;

/// Text table width from `COLUMNS`, clamped to a readable minimum.
pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_WIDTH);
    cmp::max(from_env, MIN_WIDTH)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders one cell of a record or run row as plain text.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            Some(float) => format!("{float:.2}"),
            None => number.to_string(),
        },
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

/// Lays `rows` out as an aligned table that fits `max_width`, wrapping long
/// cells. When even the narrowest layout does not fit, each row becomes a
/// labelled block instead.
pub fn render_table(
    columns: &[Column],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let Some(widths) = fit_widths(columns, rows, max_width) else {
        return render_blocks(columns, rows, block_label);
    };

    let header = columns
        .iter()
        .map(|column| column.name.clone())
        .collect::<Vec<String>>();
    let mut output = vec![format_line(columns, &header, &widths)];

    for row in rows {
        let wrapped = widths
            .iter()
            .enumerate()
            .map(|(index, width)| wrap_cell(row.get(index).map_or("", String::as_str), *width))
            .collect::<Vec<Vec<String>>>();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

        for line_index in 0..height {
            let cells = wrapped
                .iter()
                .map(|chunks| chunks.get(line_index).cloned().unwrap_or_default())
                .collect::<Vec<String>>();
            output.push(format_line(columns, &cells, &widths));
        }
    }

    output
}

// Shrinks the widest column one character at a time until the row fits.
fn fit_widths(columns: &[Column], rows: &[Vec<String>], max_width: usize) -> Option<Vec<usize>> {
    let mut widths = columns
        .iter()
        .map(|column| column.name.chars().count())
        .collect::<Vec<usize>>();
    for row in rows {
        for (slot, value) in widths.iter_mut().zip(row) {
            *slot = cmp::max(*slot, value.chars().count());
        }
    }

    let floors = columns
        .iter()
        .map(|column| cmp::max(column.name.chars().count(), MIN_COLUMN_WIDTH))
        .collect::<Vec<usize>>();
    let budget = max_width
        .saturating_sub(INDENT)
        .saturating_sub(COLUMN_GAP * columns.len().saturating_sub(1));

    let mut total = widths.iter().sum::<usize>();
    while total > budget {
        let widest = widths
            .iter()
            .enumerate()
            .filter(|(index, width)| **width > floors[*index])
            .max_by_key(|(_, width)| **width)
            .map(|(index, _)| index)?;
        widths[widest] -= 1;
        total -= 1;
    }

    Some(widths)
}

fn format_line(columns: &[Column], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .zip(widths)
        .zip(cells)
        .map(|((column, width), value)| match column.align {
            Align::Left => format!("{value:<width$}"),
            Align::Right => format!("{value:>width$}"),
        })
        .collect::<Vec<String>>();
    let line = format!("{}{}", " ".repeat(INDENT), pieces.join(&" ".repeat(COLUMN_GAP)));
    line.trim_end().to_string()
}

fn wrap_cell(value: &str, width: usize) -> Vec<String> {
    if width == 0 || value.chars().count() <= width {
        return vec![value.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in value.split_whitespace() {
        let candidate = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate <= width {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        let mut chunks = split_chars(word, width);
        if let Some(last) = chunks.pop() {
            lines.extend(chunks);
            current = last;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn split_chars(token: &str, width: usize) -> Vec<String> {
    let chars = token.chars().collect::<Vec<char>>();
    chars
        .chunks(cmp::max(width, 1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn render_blocks(columns: &[Column], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let entries_for = |row: &Vec<String>| {
        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                (
                    format!("{}:", column.name),
                    row.get(index).cloned().unwrap_or_default(),
                )
            })
            .collect::<Vec<(String, String)>>()
    };

    let mut output = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            output.push(String::new());
        }
        output.push(format!("  {block_label} {}:", row_index + 1));
        let entries = entries_for(row);
        let borrowed = entries
            .iter()
            .map(|(label, value)| (label.as_str(), value.clone()))
            .collect::<Vec<(&str, String)>>();
        output.extend(key_value_rows(&borrowed, 4));
    }
    output
}
