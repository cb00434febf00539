use std::io;

use serde_json::Value;

use super::format::{self, Column};

pub fn render_records_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("records list output requires rows"))?;
    let entity = data.get("entity").and_then(Value::as_str).unwrap_or("");

    if rows.is_empty() {
        return Ok([
            format!("No {entity} records stored yet."),
            String::new(),
            "Import some:".to_string(),
            format!("  coinpurse import run <path> --entity {entity} --dry-run"),
        ]
        .join("\n"));
    }

    let keys = data
        .get("columns")
        .and_then(Value::as_array)
        .map(|columns| {
            columns
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<String>>()
        })
        .unwrap_or_default();

    let columns = keys
        .iter()
        .map(|key| {
            if key == "amount" {
                Column::right(key.clone())
            } else {
                Column::left(key.clone())
            }
        })
        .collect::<Vec<Column>>();
    let table_rows = rows
        .iter()
        .map(|row| {
            let values = row.get("values");
            keys.iter()
                .map(|key| {
                    values
                        .and_then(|values| values.get(key))
                        .map(format::cell_text)
                        .unwrap_or_default()
                })
                .collect::<Vec<String>>()
        })
        .collect::<Vec<Vec<String>>>();

    let total = data
        .get("total")
        .and_then(Value::as_u64)
        .unwrap_or(rows.len() as u64);
    let count_label = if total == 1 {
        format!("1 {entity} record.")
    } else {
        format!("{total} {entity} records.")
    };

    let mut lines = vec![count_label, String::new()];
    lines.extend(format::render_table(
        &columns,
        &table_rows,
        format::terminal_width(),
        "Record",
    ));
    Ok(lines.join("\n"))
}
