use serde::Serialize;
use thiserror::Error;

use crate::import::fields::FieldSet;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum MappingError {
    #[error("`{0}` is not a field of this import.")]
    UnknownField(String),
    #[error("Column {column} does not exist; the file has {available} columns.")]
    ColumnOutOfRange { column: usize, available: usize },
}

/// Field key → column index, kept in field-set order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ColumnMapping {
    entries: Vec<MappingEntry>,
    #[serde(skip)]
    column_count: usize,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct MappingEntry {
    pub field_key: String,
    pub column: Option<usize>,
}

impl ColumnMapping {
    pub fn unmapped(fields: &FieldSet, column_count: usize) -> Self {
        Self {
            entries: fields
                .fields()
                .iter()
                .map(|field| MappingEntry {
                    field_key: field.key.clone(),
                    column: None,
                })
                .collect(),
            column_count,
        }
    }

    pub fn column_for(&self, field_key: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.field_key == field_key)
            .and_then(|entry| entry.column)
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn set(&mut self, field_key: &str, column: Option<usize>) -> Result<(), MappingError> {
        if let Some(index) = column
            && index >= self.column_count
        {
            return Err(MappingError::ColumnOutOfRange {
                column: index,
                available: self.column_count,
            });
        }

        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.field_key == field_key)
        else {
            return Err(MappingError::UnknownField(field_key.to_string()));
        };
        entry.column = column;
        Ok(())
    }

    pub fn is_mapped(&self, field_key: &str) -> bool {
        self.column_for(field_key).is_some()
    }
}

/// Lower-cases and keeps only ASCII letters and digits.
pub fn normalize_name(value: &str) -> String {
    value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|character| character.to_ascii_lowercase())
        .collect()
}

/// Seeds a mapping from header names. For each field the first header whose
/// normalized name equals, contains, or sits inside the field's normalized key
/// or label wins.
pub fn guess_mapping(headers: &[String], fields: &FieldSet) -> ColumnMapping {
    let mut mapping = ColumnMapping::unmapped(fields, headers.len());
    let normalized_headers = headers
        .iter()
        .map(|header| normalize_name(header))
        .collect::<Vec<String>>();

    for (entry, field) in mapping.entries.iter_mut().zip(fields.fields()) {
        let candidates = [normalize_name(&field.key), normalize_name(&field.label)];
        entry.column = normalized_headers.iter().position(|header| {
            !header.is_empty()
                && candidates
                    .iter()
                    .filter(|candidate| !candidate.is_empty())
                    .any(|candidate| names_overlap(header, candidate))
        });
    }

    mapping
}

fn names_overlap(header: &str, candidate: &str) -> bool {
    header == candidate || header.contains(candidate) || candidate.contains(header)
}

#[cfg(test)]
mod tests {
    use super::{ColumnMapping, MappingError, guess_mapping, normalize_name};
    use crate::import::fields::{FieldDefinition, FieldSet, FieldSetError, FieldType};

    fn expense_fields() -> Result<FieldSet, FieldSetError> {
        FieldSet::new(vec![
            FieldDefinition::new("date", "Date", FieldType::Date).required(),
            FieldDefinition::new("amount", "Amount", FieldType::Number).required(),
            FieldDefinition::new("title", "Title", FieldType::Text).required(),
            FieldDefinition::new("category", "Category", FieldType::Text),
        ])
    }

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn normalization_strips_punctuation_and_case() {
        assert_eq!(normalize_name("Transaction Date (UTC)"), "transactiondateutc");
        assert_eq!(normalize_name("  --  "), "");
    }

    #[test]
    fn guesses_by_containment_in_either_direction() {
        let fields = expense_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let mapping = guess_mapping(
                &headers(&["Posted Date", "Amt", "Expense Title", "Cat", "Amount (USD)"]),
                &fields,
            );
            assert_eq!(mapping.column_for("date"), Some(0));
            // "amt" is not contained in "amount" and vice versa; first real hit wins.
            assert_eq!(mapping.column_for("amount"), Some(4));
            assert_eq!(mapping.column_for("title"), Some(2));
            // "cat" sits inside "category".
            assert_eq!(mapping.column_for("category"), Some(3));
        }
    }

    #[test]
    fn first_matching_header_wins_and_blank_headers_never_match() {
        let fields = expense_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let mapping = guess_mapping(&headers(&["", "Date", "Value Date"]), &fields);
            assert_eq!(mapping.column_for("date"), Some(1));
            assert_eq!(mapping.column_for("amount"), None);
            assert_eq!(mapping.column_for("title"), None);
        }
    }

    #[test]
    fn overrides_are_validated() {
        let fields = expense_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let mut mapping = ColumnMapping::unmapped(&fields, 2);
            assert!(mapping.set("title", Some(1)).is_ok());
            assert!(mapping.is_mapped("title"));
            assert_eq!(
                mapping.set("title", Some(2)),
                Err(MappingError::ColumnOutOfRange {
                    column: 2,
                    available: 2
                })
            );
            assert_eq!(
                mapping.set("notes", None),
                Err(MappingError::UnknownField("notes".to_string()))
            );
            assert!(mapping.set("title", None).is_ok());
            assert!(!mapping.is_mapped("title"));
        }
    }
}
