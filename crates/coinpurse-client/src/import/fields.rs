use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
        }
    }
}

/// One importable target field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl FieldDefinition {
    pub fn new(key: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            required: false,
            field_type,
            hint: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_hint(mut self, hint: &str) -> Self {
        self.hint = Some(hint.to_string());
        self
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FieldSetError {
    #[error("field set must contain at least one field")]
    Empty,
    #[error("field key `{0}` is defined more than once")]
    DuplicateKey(String),
    #[error("field key must be non-empty")]
    BlankKey,
}

/// An ordered, immutable set of field definitions with unique keys.
#[derive(Debug, Clone)]
pub struct FieldSet {
    fields: Vec<FieldDefinition>,
}

impl FieldSet {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, FieldSetError> {
        if fields.is_empty() {
            return Err(FieldSetError::Empty);
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.key.trim().is_empty() {
                return Err(FieldSetError::BlankKey);
            }
            if !seen.insert(field.key.as_str()) {
                return Err(FieldSetError::DuplicateKey(field.key.clone()));
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|field| field.required)
    }

    /// A record holding every key of this set, all empty.
    pub fn empty_record(&self) -> Record {
        Record {
            values: self
                .fields
                .iter()
                .map(|field| (field.key.clone(), FieldValue::Empty))
                .collect(),
        }
    }

    /// Rebuilds a record from a stored JSON object. Keys missing from the
    /// object, or values that do not fit the field type, come back empty.
    pub fn record_from_json(&self, value: &Value) -> Record {
        let mut record = self.empty_record();
        let Some(object) = value.as_object() else {
            return record;
        };

        for field in &self.fields {
            let decoded = match (field.field_type, object.get(&field.key)) {
                (FieldType::Number, Some(Value::Number(number))) => {
                    number.as_f64().map(FieldValue::Number)
                }
                (FieldType::Text, Some(Value::String(text))) if !text.is_empty() => {
                    Some(FieldValue::Text(text.clone()))
                }
                (FieldType::Date, Some(Value::String(text))) if !text.is_empty() => {
                    Some(FieldValue::Date(text.clone()))
                }
                _ => None,
            };
            if let Some(decoded) = decoded {
                record.values.insert(field.key.clone(), decoded);
            }
        }

        record
    }
}

/// A coerced cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    /// Always `YYYY-MM-DD`.
    Date(String),
    Empty,
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) | Self::Date(value) => value.is_empty(),
            Self::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) | Self::Date(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(value) | Self::Date(value) => Value::String(value.clone()),
            Self::Number(value) => Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Empty => Value::Null,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) | Self::Date(value) => f.write_str(value),
            Self::Number(value) => write!(f, "{value}"),
            Self::Empty => Ok(()),
        }
    }
}

static EMPTY_VALUE: FieldValue = FieldValue::Empty;

/// One coerced row. Built from a [`FieldSet`], so its keys always equal the
/// set's keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn get(&self, key: &str) -> &FieldValue {
        self.values.get(key).unwrap_or(&EMPTY_VALUE)
    }

    /// Overwrites an existing key. Unknown keys are ignored so the key set
    /// stays fixed.
    pub fn set(&mut self, key: &str, value: FieldValue) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = value;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn to_json(&self) -> Value {
        let object = self
            .values
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect::<Map<String, Value>>();
        Value::Object(object)
    }
}

impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FieldDefinition, FieldSet, FieldSetError, FieldType, FieldValue};

    fn sample_fields() -> Result<FieldSet, FieldSetError> {
        FieldSet::new(vec![
            FieldDefinition::new("date", "Date", FieldType::Date).required(),
            FieldDefinition::new("amount", "Amount", FieldType::Number).required(),
            FieldDefinition::new("title", "Title", FieldType::Text),
        ])
    }

    #[test]
    fn rejects_duplicate_and_blank_keys() {
        let duplicate = FieldSet::new(vec![
            FieldDefinition::new("date", "Date", FieldType::Date),
            FieldDefinition::new("date", "Posted", FieldType::Date),
        ]);
        assert_eq!(
            duplicate.err(),
            Some(FieldSetError::DuplicateKey("date".to_string()))
        );

        let blank = FieldSet::new(vec![FieldDefinition::new(" ", "Blank", FieldType::Text)]);
        assert_eq!(blank.err(), Some(FieldSetError::BlankKey));
        assert_eq!(FieldSet::new(Vec::new()).err(), Some(FieldSetError::Empty));
    }

    #[test]
    fn empty_record_carries_every_key() {
        let fields = sample_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let record = fields.empty_record();
            let keys = record.keys().collect::<Vec<&str>>();
            assert_eq!(keys, vec!["amount", "date", "title"]);
            assert!(record.get("title").is_empty());
        }
    }

    #[test]
    fn set_ignores_unknown_keys() {
        let fields = sample_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let mut record = fields.empty_record();
            record.set("category", FieldValue::Text("Food".to_string()));
            record.set("title", FieldValue::Text("Rent".to_string()));
            assert_eq!(record.keys().count(), 3);
            assert_eq!(record.get("title").as_text(), Some("Rent"));
        }
    }

    #[test]
    fn json_round_trip_respects_field_types() {
        let fields = sample_fields();
        assert!(fields.is_ok());
        if let Ok(fields) = fields {
            let record = fields.record_from_json(&json!({
                "date": "2024-03-15",
                "amount": 12.5,
                "title": 7,
                "extra": "ignored"
            }));
            assert_eq!(
                record.get("date"),
                &FieldValue::Date("2024-03-15".to_string())
            );
            assert_eq!(record.get("amount").as_number(), Some(12.5));
            assert!(record.get("title").is_empty());
            assert_eq!(
                record.to_json(),
                json!({"date": "2024-03-15", "amount": 12.5, "title": null})
            );
        }
    }
}
