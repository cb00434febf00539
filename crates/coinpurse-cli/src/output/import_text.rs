use std::io;

use chrono::{Local, TimeZone};
use serde_json::{Map, Value};

use super::format::{self, Column};

const DUPLICATE_PREVIEW_ROWS: usize = 10;

pub fn render_import_run(data: &Value) -> io::Result<String> {
    let summary = data
        .get("summary")
        .and_then(Value::as_object)
        .ok_or_else(|| io::Error::other("import output requires summary"))?;
    let dry_run = data
        .get("dry_run")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut lines = vec![get_str(data, "message").to_string(), String::new()];

    lines.push("Summary:".to_string());
    let mut entries = Vec::new();
    if let Some(import_id) = data.get("import_id").and_then(Value::as_str) {
        entries.push(("Import ID:", import_id.to_string()));
    }
    entries.push(("File:", get_str(data, "file_name").to_string()));
    entries.push(("Entity:", get_str(data, "entity").to_string()));
    entries.push(("Date format:", get_str(data, "date_format").to_string()));
    entries.push(("Duplicates:", get_str(data, "duplicate_policy").to_string()));
    entries.push(("Rows read:", get_u64(summary, "rows_read").to_string()));
    entries.push(("Rows new:", get_u64(summary, "rows_valid").to_string()));
    entries.push((
        "Rows duplicate:",
        get_u64(summary, "rows_duplicate").to_string(),
    ));
    entries.push(("Rows invalid:", get_u64(summary, "rows_invalid").to_string()));
    entries.push(("To import:", get_u64(summary, "to_import").to_string()));
    lines.extend(format::key_value_rows(&entries, 2));

    if let Some(outcome) = data.get("outcome").and_then(Value::as_object) {
        lines.push(String::new());
        lines.push("Outcome:".to_string());
        lines.extend(format::key_value_rows(
            &[
                ("Imported:", get_u64(outcome, "imported").to_string()),
                ("Skipped:", get_u64(outcome, "skipped").to_string()),
                ("Failed:", get_u64(outcome, "failed").to_string()),
                (
                    "Duplicates included:",
                    get_u64(outcome, "dup_included").to_string(),
                ),
            ],
            2,
        ));
    }

    lines.push(String::new());
    lines.extend(render_mapping(data));

    let invalid_rows = get_array(data, "invalid_rows");
    if !invalid_rows.is_empty() {
        lines.push(String::new());
        lines.push(format!("Invalid rows ({}):", invalid_rows.len()));
        for row in invalid_rows {
            lines.push(format!(
                "  Row {}: {}",
                row.get("row").and_then(Value::as_u64).unwrap_or(0),
                get_str(row, "reason")
            ));
        }
    }

    let duplicate_rows = get_array(data, "duplicate_rows");
    if !duplicate_rows.is_empty() {
        lines.push(String::new());
        lines.extend(render_duplicates(data, duplicate_rows));
    }

    let preview = get_array(data, "preview");
    if !preview.is_empty() {
        lines.push(String::new());
        lines.push(format!("Preview (first {} rows as read):", preview.len()));
        let keys = mapped_field_keys(data);
        let columns = keys
            .iter()
            .map(|key| Column::left(key.clone()))
            .collect::<Vec<Column>>();
        let rows = preview
            .iter()
            .map(|record| record_cells(record, &keys))
            .collect::<Vec<Vec<String>>>();
        lines.extend(format::render_table(
            &columns,
            &rows,
            format::terminal_width(),
            "Row",
        ));
    }

    if dry_run {
        lines.push(String::new());
        lines.push("No records were written because this was a dry run.".to_string());
    }

    lines.push(String::new());
    lines.extend(render_next_step(data));

    Ok(lines.join("\n"))
}

pub fn render_import_fields(data: &Value) -> io::Result<String> {
    let fields = data
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import fields output requires fields"))?;

    let mut lines = vec![
        format!(
            "{} ({})",
            get_str(data, "display_name"),
            get_str(data, "entity")
        ),
        String::new(),
        "Fields:".to_string(),
    ];

    let columns = [
        Column::left("Key"),
        Column::left("Label"),
        Column::left("Type"),
        Column::left("Required"),
        Column::left("Hint"),
    ];
    let rows = fields
        .iter()
        .map(|field| {
            vec![
                get_str(field, "key").to_string(),
                get_str(field, "label").to_string(),
                get_str(field, "type").to_string(),
                if field.get("required").and_then(Value::as_bool) == Some(true) {
                    "yes".to_string()
                } else {
                    "no".to_string()
                },
                get_str(field, "hint").to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table(
        &columns,
        &rows,
        format::terminal_width(),
        "Field",
    ));

    lines.push(String::new());
    let detection = if data.get("duplicate_detection").and_then(Value::as_bool) == Some(true) {
        "Rows matching an existing record are reported as duplicates."
    } else {
        "This entity has no duplicate detection; every valid row is new."
    };
    lines.push(detection.to_string());

    let formats = get_array(data, "date_formats")
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<&str>>();
    lines.push(String::new());
    lines.push(format!("Date formats: {}", formats.join(", ")));

    Ok(lines.join("\n"))
}

pub fn render_import_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("import list output requires rows"))?;

    if rows.is_empty() {
        return Ok([
            "No imports found yet.",
            "",
            "Run your first import:",
            "  1. coinpurse import run --help",
            "  2. coinpurse import run <path> --entity <entity> --dry-run",
            "  3. coinpurse import run <path> --entity <entity>",
        ]
        .join("\n"));
    }

    let count_label = if rows.len() == 1 {
        "1 import found.".to_string()
    } else {
        format!("{} imports found.", rows.len())
    };

    let columns = [
        Column::left("Import ID"),
        Column::left("Entity"),
        Column::left("Status"),
        Column::left("Created (local)"),
        Column::left("File"),
        Column::right("Read"),
        Column::right("Imported"),
        Column::right("Skipped"),
        Column::right("Failed"),
    ];
    let table_rows = rows
        .iter()
        .map(|row| {
            vec![
                get_str(row, "import_id").to_string(),
                get_str(row, "entity").to_string(),
                get_str(row, "status").to_string(),
                format_created_local(row),
                get_str(row, "file_name").to_string(),
                row_count(row, "rows_read"),
                row_count(row, "imported"),
                row_count(row, "skipped"),
                row_count(row, "failed"),
            ]
        })
        .collect::<Vec<Vec<String>>>();

    let mut lines = vec![count_label, String::new(), "Imports:".to_string()];
    lines.extend(format::render_table(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Import",
    ));
    Ok(lines.join("\n"))
}

fn render_mapping(data: &Value) -> Vec<String> {
    let mut lines = vec!["Column mapping:".to_string()];
    let columns = [
        Column::left("Field"),
        Column::left("Required"),
        Column::left("Column"),
    ];
    let rows = get_array(data, "mapping")
        .iter()
        .map(|item| {
            let required = item.get("required").and_then(Value::as_bool) == Some(true);
            let column = match (
                item.get("column").and_then(Value::as_u64),
                item.get("header").and_then(Value::as_str),
            ) {
                (Some(index), Some(header)) => format!("{index}. {header}"),
                (Some(index), None) => index.to_string(),
                _ => "(not mapped)".to_string(),
            };
            vec![
                format!("{} ({})", get_str(item, "label"), get_str(item, "field")),
                (if required { "yes" } else { "no" }).to_string(),
                column,
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table(
        &columns,
        &rows,
        format::terminal_width(),
        "Field",
    ));
    lines
}

fn render_duplicates(data: &Value, duplicate_rows: &[Value]) -> Vec<String> {
    let total = duplicate_rows.len();
    let shown = total.min(DUPLICATE_PREVIEW_ROWS);
    let mut lines = if shown < total {
        vec![format!(
            "Duplicate rows (showing first {shown} of {total}):"
        )]
    } else {
        vec![format!("Duplicate rows ({total}):")]
    };

    let keys = mapped_field_keys(data);
    for row in duplicate_rows.iter().take(shown) {
        let values = row
            .get("record")
            .map(|record| {
                keys.iter()
                    .zip(record_cells(record, &keys))
                    .filter(|(_, cell)| !cell.is_empty())
                    .map(|(key, cell)| format!("{key}={cell}"))
                    .collect::<Vec<String>>()
                    .join(", ")
            })
            .unwrap_or_default();
        lines.push(format!(
            "  Row {}: {values}",
            row.get("row").and_then(Value::as_u64).unwrap_or(0)
        ));
    }
    lines
}

fn render_next_step(data: &Value) -> Vec<String> {
    let mut lines = vec!["Next step:".to_string()];
    match data.get("next_step").and_then(Value::as_object) {
        Some(next_step) => {
            let label = next_step
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or("Run the next command");
            let command = next_step
                .get("command")
                .and_then(Value::as_str)
                .unwrap_or("coinpurse --help");
            lines.push(format!("  {label}:"));
            lines.push(format!("  {command}"));
        }
        None => lines.push("  Missing `next_step` in import response.".to_string()),
    }
    lines
}

fn mapped_field_keys(data: &Value) -> Vec<String> {
    get_array(data, "mapping")
        .iter()
        .filter(|item| item.get("column").is_some_and(|column| !column.is_null()))
        .map(|item| get_str(item, "field").to_string())
        .collect()
}

fn record_cells(record: &Value, keys: &[String]) -> Vec<String> {
    keys.iter()
        .map(|key| record.get(key).map(format::cell_text).unwrap_or_default())
        .collect()
}

fn get_str<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn get_u64(map: &Map<String, Value>, key: &str) -> u64 {
    map.get(key).and_then(Value::as_u64).unwrap_or(0)
}

fn get_array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn row_count(row: &Value, key: &str) -> String {
    row.get(key).and_then(Value::as_i64).unwrap_or(0).to_string()
}

fn format_created_local(row: &Value) -> String {
    let Some(created_at) = row
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(|text| text.parse::<i64>().ok())
    else {
        return "unknown".to_string();
    };
    let Some(local_dt) = Local.timestamp_opt(created_at, 0).single() else {
        return "unknown".to_string();
    };
    local_dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{render_import_fields, render_import_list, render_import_run};

    fn run_payload(dry_run: bool) -> Value {
        json!({
            "dry_run": dry_run,
            "entity": "expenses",
            "file_name": "march.csv",
            "message": "Dry run: 2 of 3 rows would be imported. No records were written.",
            "date_format": "auto",
            "duplicate_policy": "skip",
            "mapping": [
                {"field": "date", "label": "Date", "required": true, "column": 1, "header": "Date"},
                {"field": "amount", "label": "Amount", "required": true, "column": 2, "header": "Amount"},
                {"field": "title", "label": "Title", "required": true, "column": 3, "header": "Title"},
                {"field": "notes", "label": "Notes", "required": false, "column": null, "header": null}
            ],
            "summary": {"rows_read": 3, "rows_valid": 2, "rows_duplicate": 0, "rows_invalid": 1, "to_import": 2},
            "invalid_rows": [{"row": 3, "reason": "Missing required field(s): Date"}],
            "duplicate_rows": [],
            "preview": [
                {"date": "2024-03-15", "amount": 1200.5, "title": "Rent", "notes": null}
            ],
            "next_step": {"label": "Run the import", "command": "coinpurse import run <path> --entity expenses"}
        })
    }

    #[test]
    fn dry_run_text_lists_mapping_invalid_rows_and_preview() {
        let rendered = render_import_run(&run_payload(true));
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Dry run: 2 of 3 rows would be imported."));
            assert!(text.contains("Rows invalid:"));
            assert!(text.contains("Date (date)"));
            assert!(text.contains("1. Date"));
            assert!(text.contains("(not mapped)"));
            assert!(text.contains("  Row 3: Missing required field(s): Date"));
            assert!(text.contains("1200.50"));
            assert!(text.contains("No records were written because this was a dry run."));
            assert!(text.contains("  coinpurse import run <path> --entity expenses"));
            assert!(!text.contains("Outcome:"));
        }
    }

    #[test]
    fn committed_run_shows_outcome() {
        let mut payload = run_payload(false);
        payload["import_id"] = json!("imp_01J");
        payload["outcome"] = json!({"imported": 1, "skipped": 0, "failed": 1, "dup_included": 0});
        let rendered = render_import_run(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.contains("imp_01J"));
            assert!(text.contains("Outcome:"));
            assert!(text.contains("Failed:"));
            assert!(!text.contains("this was a dry run"));
        }
    }

    #[test]
    fn import_run_without_summary_is_an_error() {
        assert!(render_import_run(&json!({})).is_err());
    }

    #[test]
    fn fields_text_lists_every_field() {
        let payload = json!({
            "entity": "loans",
            "display_name": "Loans",
            "accent_color": "#f59e0b",
            "duplicate_detection": true,
            "fields": [
                {"key": "date", "label": "Date", "required": true, "type": "date"},
                {"key": "direction", "label": "Direction", "required": false, "type": "text", "hint": "lent or borrowed"}
            ],
            "date_formats": ["auto", "YYYY-MM-DD"]
        });
        let rendered = render_import_fields(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("Loans (loans)"));
            assert!(text.contains("direction"));
            assert!(text.contains("lent or borrowed"));
            assert!(text.contains("Date formats: auto, YYYY-MM-DD"));
        }
    }

    #[test]
    fn empty_import_list_points_at_the_first_import() {
        let rendered = render_import_list(&json!({"rows": []}));
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("No imports found yet."));
        }
    }

    #[test]
    fn import_list_renders_counts() {
        let payload = json!({
            "rows": [{
                "import_id": "imp_1",
                "entity": "expenses",
                "status": "completed",
                "created_at": "not-a-timestamp",
                "file_name": "march.csv",
                "rows_read": 3,
                "imported": 2,
                "skipped": 0,
                "failed": 0
            }]
        });
        let rendered = render_import_list(&payload);
        assert!(rendered.is_ok());
        if let Ok(text) = rendered {
            assert!(text.starts_with("1 import found."));
            assert!(text.contains("imp_1"));
            assert!(text.contains("unknown"));
        }
    }
}
