//! The tracker's importable entities: field sets plus the identity key used
//! to spot rows that already exist.

use std::sync::Arc;

use crate::import::{FieldDefinition, FieldSet, FieldSetError, FieldType, IdentityKeyFn, Record};
use crate::{ClientError, ClientResult};

pub const ENTITY_NAMES: [&str; 6] = ["expenses", "income", "loans", "bank", "savings", "notes"];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Entity {
    Expenses,
    Income,
    Loans,
    Bank,
    Savings,
    Notes,
}

/// One part of an identity key.
#[derive(Debug, Clone, Copy)]
enum KeyPart {
    Exact(&'static str),
    Lowercase(&'static str),
    /// Lower-cased, and an empty value is allowed.
    OptionalLowercase(&'static str),
}

impl Entity {
    pub fn parse(value: &str) -> ClientResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "expenses" => Ok(Self::Expenses),
            "income" => Ok(Self::Income),
            "loans" => Ok(Self::Loans),
            "bank" => Ok(Self::Bank),
            "savings" => Ok(Self::Savings),
            "notes" => Ok(Self::Notes),
            _ => Err(ClientError::unknown_entity(value, &ENTITY_NAMES)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Expenses => "expenses",
            Self::Income => "income",
            Self::Loans => "loans",
            Self::Bank => "bank",
            Self::Savings => "savings",
            Self::Notes => "notes",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Expenses => "Expenses",
            Self::Income => "Income",
            Self::Loans => "Loans & Lends",
            Self::Bank => "Bank Ledger",
            Self::Savings => "Savings",
            Self::Notes => "Notes",
        }
    }

    pub fn accent_color(&self) -> &'static str {
        match self {
            Self::Expenses => "#ef4444",
            Self::Income => "#10b981",
            Self::Loans => "#f59e0b",
            Self::Bank => "#3b82f6",
            Self::Savings => "#8b5cf6",
            Self::Notes => "#64748b",
        }
    }

    pub fn field_set(&self) -> Result<FieldSet, FieldSetError> {
        FieldSet::new(self.field_definitions())
    }

    fn field_definitions(&self) -> Vec<FieldDefinition> {
        let date = FieldDefinition::new("date", "Date", FieldType::Date).required();
        let amount = FieldDefinition::new("amount", "Amount", FieldType::Number)
            .required()
            .with_hint("Currency symbols and thousands separators are ignored.");
        let notes = FieldDefinition::new("notes", "Notes", FieldType::Text);
        let category = FieldDefinition::new("category", "Category", FieldType::Text);

        match self {
            Self::Expenses => vec![
                date,
                amount,
                FieldDefinition::new("title", "Title", FieldType::Text).required(),
                category,
                notes,
            ],
            Self::Income => vec![
                date,
                amount,
                FieldDefinition::new("source", "Source", FieldType::Text).required(),
                category,
                notes,
            ],
            Self::Loans => vec![
                date,
                FieldDefinition::new("person", "Person", FieldType::Text).required(),
                amount,
                FieldDefinition::new("direction", "Direction", FieldType::Text)
                    .with_hint("`lent` or `borrowed`."),
                notes,
            ],
            Self::Bank => vec![
                date,
                FieldDefinition::new("description", "Description", FieldType::Text).required(),
                amount,
                FieldDefinition::new("bank", "Bank", FieldType::Text),
                FieldDefinition::new("kind", "Type", FieldType::Text)
                    .with_hint("`credit` or `debit`."),
            ],
            Self::Savings => vec![
                date,
                amount,
                FieldDefinition::new("goal", "Goal", FieldType::Text).required(),
                notes,
            ],
            Self::Notes => vec![
                FieldDefinition::new("title", "Title", FieldType::Text).required(),
                FieldDefinition::new("content", "Content", FieldType::Text),
                FieldDefinition::new("date", "Date", FieldType::Date),
            ],
        }
    }

    fn key_parts(&self) -> &'static [KeyPart] {
        match self {
            Self::Expenses => &[
                KeyPart::Exact("date"),
                KeyPart::Exact("amount"),
                KeyPart::Lowercase("title"),
            ],
            Self::Income => &[
                KeyPart::Exact("date"),
                KeyPart::Exact("amount"),
                KeyPart::Lowercase("source"),
            ],
            Self::Loans => &[
                KeyPart::Exact("date"),
                KeyPart::Lowercase("person"),
                KeyPart::Exact("amount"),
                KeyPart::OptionalLowercase("direction"),
            ],
            Self::Bank => &[
                KeyPart::Exact("date"),
                KeyPart::Exact("amount"),
                KeyPart::Lowercase("description"),
            ],
            Self::Savings => &[
                KeyPart::Exact("date"),
                KeyPart::Exact("amount"),
                KeyPart::Lowercase("goal"),
            ],
            Self::Notes => &[],
        }
    }

    /// `None` for entities without duplicate detection.
    pub fn identity_key(&self) -> Option<Arc<IdentityKeyFn>> {
        let parts = self.key_parts();
        if parts.is_empty() {
            return None;
        }
        Some(Arc::new(move |record: &Record| identity_key(record, parts)))
    }
}

fn identity_key(record: &Record, parts: &[KeyPart]) -> Option<String> {
    let mut components = Vec::with_capacity(parts.len());
    for part in parts {
        let component = match *part {
            KeyPart::Exact(key) => {
                let value = record.get(key);
                if value.is_empty() {
                    return None;
                }
                value.to_string()
            }
            KeyPart::Lowercase(key) => {
                let value = record.get(key);
                if value.is_empty() {
                    return None;
                }
                value.to_string().to_lowercase()
            }
            KeyPart::OptionalLowercase(key) => record.get(key).to_string().to_lowercase(),
        };
        components.push(component);
    }
    Some(components.join("|"))
}
