use crate::import::amount::coerce_amount;
use crate::import::date::{DateFormat, coerce_date};
use crate::import::fields::{FieldSet, FieldType, FieldValue, Record};
use crate::import::mapping::ColumnMapping;
use crate::import::table::RawTable;

/// Converts one raw cell into the field's type. Never fails: anything that
/// cannot be read becomes [`FieldValue::Empty`].
pub fn coerce_cell(raw: &str, field_type: FieldType, date_format: DateFormat) -> FieldValue {
    match field_type {
        FieldType::Text => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                FieldValue::Empty
            } else {
                FieldValue::Text(trimmed.to_string())
            }
        }
        FieldType::Number => coerce_amount(raw)
            .map(FieldValue::Number)
            .unwrap_or(FieldValue::Empty),
        FieldType::Date => coerce_date(raw, date_format)
            .map(FieldValue::Date)
            .unwrap_or(FieldValue::Empty),
    }
}

/// Builds one record per data row from the current mapping and date format.
/// Unmapped fields stay empty but keep their key.
pub fn build_records(
    table: &RawTable,
    fields: &FieldSet,
    mapping: &ColumnMapping,
    date_format: DateFormat,
) -> Vec<Record> {
    (0..table.row_count())
        .map(|row| build_record(table, row, fields, mapping, date_format))
        .collect()
}

pub fn build_record(
    table: &RawTable,
    row: usize,
    fields: &FieldSet,
    mapping: &ColumnMapping,
    date_format: DateFormat,
) -> Record {
    let mut record = fields.empty_record();
    for field in fields.fields() {
        let Some(column) = mapping.column_for(&field.key) else {
            continue;
        };
        let value = coerce_cell(table.cell(row, column), field.field_type, date_format);
        record.set(&field.key, value);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::{build_records, coerce_cell};
    use crate::import::date::DateFormat;
    use crate::import::fields::{FieldDefinition, FieldSet, FieldType, FieldValue};
    use crate::import::mapping::guess_mapping;
    use crate::import::table::parse_upload;

    #[test]
    fn cells_coerce_by_field_type() {
        assert_eq!(
            coerce_cell("  Rent ", FieldType::Text, DateFormat::Auto),
            FieldValue::Text("Rent".to_string())
        );
        assert_eq!(
            coerce_cell("   ", FieldType::Text, DateFormat::Auto),
            FieldValue::Empty
        );
        assert_eq!(
            coerce_cell("$1,200.50", FieldType::Number, DateFormat::Auto),
            FieldValue::Number(1200.5)
        );
        assert_eq!(
            coerce_cell("13/04/2024", FieldType::Date, DateFormat::Auto),
            FieldValue::Date("2024-04-13".to_string())
        );
        assert_eq!(
            coerce_cell("13/04/2024", FieldType::Date, DateFormat::MonthDayYearSlash),
            FieldValue::Empty
        );
    }

    #[test]
    fn records_keep_every_key_even_when_unmapped() {
        let fields = FieldSet::new(vec![
            FieldDefinition::new("date", "Date", FieldType::Date).required(),
            FieldDefinition::new("amount", "Amount", FieldType::Number).required(),
            FieldDefinition::new("title", "Title", FieldType::Text).required(),
            FieldDefinition::new("notes", "Notes", FieldType::Text),
        ]);
        let table = parse_upload("rows.csv", "Date,Amount,Title\n2024-03-15,\"$1,200.50\",Rent\n");
        assert!(fields.is_ok());
        assert!(table.is_ok());
        if let (Ok(fields), Ok(table)) = (fields, table) {
            let mapping = guess_mapping(&table.headers, &fields);
            let records = build_records(&table, &fields, &mapping, DateFormat::Auto);
            assert_eq!(records.len(), 1);
            let record = &records[0];
            assert_eq!(record.keys().count(), 4);
            assert_eq!(record.get("date").as_text(), Some("2024-03-15"));
            assert_eq!(record.get("amount").as_number(), Some(1200.5));
            assert_eq!(record.get("title").as_text(), Some("Rent"));
            assert!(record.get("notes").is_empty());
        }
    }
}
