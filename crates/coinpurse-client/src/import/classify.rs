use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::import::fields::{FieldSet, Record};

/// Caller-supplied identity extractor. `None` means the record has no key and
/// can never be a duplicate.
pub type IdentityKeyFn = dyn Fn(&Record) -> Option<String> + Send + Sync;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub valid: Vec<Record>,
    pub duplicates: Vec<DuplicateRow>,
    pub invalid: Vec<InvalidRow>,
}

impl AnalysisResult {
    pub fn total_rows(&self) -> usize {
        self.valid.len() + self.duplicates.len() + self.invalid.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateRow {
    /// 1-based data row.
    pub row: usize,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidRow {
    pub row: usize,
    pub record: Record,
    pub reason: String,
}

pub fn existing_keys(existing: &[Record], key_fn: Option<&IdentityKeyFn>) -> HashSet<String> {
    let Some(key_fn) = key_fn else {
        return HashSet::new();
    };
    existing.iter().filter_map(|record| key_fn(record)).collect()
}

/// Partitions records into valid, duplicate and invalid, keeping input order
/// within each list. A missing required field wins over a duplicate match.
pub fn classify(
    records: Vec<Record>,
    fields: &FieldSet,
    existing: &[Record],
    key_fn: Option<&IdentityKeyFn>,
) -> AnalysisResult {
    let known_keys = existing_keys(existing, key_fn);
    let mut result = AnalysisResult::default();

    for (index, record) in records.into_iter().enumerate() {
        let row = index + 1;
        let missing = fields
            .required_fields()
            .filter(|field| record.get(&field.key).is_empty())
            .map(|field| field.label.as_str())
            .collect::<Vec<&str>>();
        if !missing.is_empty() {
            let reason = format!("Missing required field(s): {}", missing.join(", "));
            result.invalid.push(InvalidRow { row, record, reason });
            continue;
        }

        let is_duplicate = key_fn
            .and_then(|key_fn| key_fn(&record))
            .is_some_and(|key| known_keys.contains(&key));
        if is_duplicate {
            result.duplicates.push(DuplicateRow { row, record });
        } else {
            result.valid.push(record);
        }
    }

    info!(
        valid = result.valid.len(),
        duplicates = result.duplicates.len(),
        invalid = result.invalid.len(),
        "classified import rows"
    );

    result
}

#[cfg(test)]
mod tests {
    use super::{IdentityKeyFn, classify, existing_keys};
    use crate::import::fields::{
        FieldDefinition, FieldSet, FieldSetError, FieldType, FieldValue, Record,
    };

    fn fields() -> Result<FieldSet, FieldSetError> {
        FieldSet::new(vec![
            FieldDefinition::new("date", "Date", FieldType::Date).required(),
            FieldDefinition::new("amount", "Amount", FieldType::Number).required(),
            FieldDefinition::new("title", "Title", FieldType::Text),
        ])
    }

    fn record(fields: &FieldSet, date: Option<&str>, amount: Option<f64>, title: &str) -> Record {
        let mut record = fields.empty_record();
        if let Some(date) = date {
            record.set("date", FieldValue::Date(date.to_string()));
        }
        if let Some(amount) = amount {
            record.set("amount", FieldValue::Number(amount));
        }
        if !title.is_empty() {
            record.set("title", FieldValue::Text(title.to_string()));
        }
        record
    }

    fn date_amount_key(record: &Record) -> Option<String> {
        let date = record.get("date").as_text()?;
        let amount = record.get("amount").as_number()?;
        Some(format!("{date}|{amount}"))
    }

    #[test]
    fn partition_is_complete_and_disjoint() {
        let fields = fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let existing = vec![record(&fields, Some("2024-01-01"), Some(5.0), "Old")];
            let rows = vec![
                record(&fields, Some("2024-01-01"), Some(5.0), "Again"),
                record(&fields, Some("2024-01-02"), Some(6.0), "New"),
                record(&fields, None, Some(7.0), "No date"),
                record(&fields, Some("2024-01-03"), Some(8.0), ""),
            ];
            let key_fn: &IdentityKeyFn = &date_amount_key;
            let result = classify(rows, &fields, &existing, Some(key_fn));

            assert_eq!(result.total_rows(), 4);
            assert_eq!(result.valid.len(), 2);
            assert_eq!(result.duplicates.len(), 1);
            assert_eq!(result.duplicates[0].row, 1);
            assert_eq!(result.invalid.len(), 1);
            assert_eq!(result.invalid[0].row, 3);
            assert_eq!(result.invalid[0].reason, "Missing required field(s): Date");
        }
    }

    #[test]
    fn missing_required_field_beats_duplicate_match() {
        let fields = fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let existing = vec![record(&fields, None, None, "Rent")];
            let title_key: &IdentityKeyFn =
                &|record: &Record| record.get("title").as_text().map(str::to_lowercase);
            let result = classify(
                vec![record(&fields, None, None, "rent")],
                &fields,
                &existing,
                Some(title_key),
            );

            assert!(result.duplicates.is_empty());
            assert_eq!(result.invalid.len(), 1);
            assert_eq!(
                result.invalid[0].reason,
                "Missing required field(s): Date, Amount"
            );
        }
    }

    #[test]
    fn no_key_function_disables_duplicate_detection() {
        let fields = fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let existing = vec![record(&fields, Some("2024-01-01"), Some(5.0), "Old")];
            assert!(existing_keys(&existing, None).is_empty());

            let result = classify(
                vec![record(&fields, Some("2024-01-01"), Some(5.0), "Old")],
                &fields,
                &existing,
                None,
            );
            assert_eq!(result.valid.len(), 1);
            assert!(result.duplicates.is_empty());
        }
    }

    #[test]
    fn keyless_records_are_never_duplicates() {
        let fields = fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let existing = vec![record(&fields, Some("2024-01-01"), Some(5.0), "")];
            let title_key: &IdentityKeyFn =
                &|record: &Record| record.get("title").as_text().map(str::to_string);
            assert!(existing_keys(&existing, Some(title_key)).is_empty());

            let result = classify(
                vec![record(&fields, Some("2024-01-01"), Some(5.0), "")],
                &fields,
                &existing,
                Some(title_key),
            );
            assert_eq!(result.valid.len(), 1);
        }
    }
}
