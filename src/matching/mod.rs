// src/matching/mod.rs
//
// Field normalization. Every normalizer is total: a value that cannot be
// parsed becomes the empty string, which comparators treat as "no signal".

pub mod address;
pub mod date;
pub mod name;
pub mod phone;
pub mod ranking;
pub mod similarity;
pub mod tfidf;

use crate::models::config::{FieldConfig, FieldType};
use crate::models::core::FieldValues;

pub use address::normalize_address;
pub use date::normalize_date;
pub use name::normalize_name;
pub use phone::normalize_phone;

/// Descriptions are compared as free text; normalization only trims.
pub fn normalize_description(description: &str) -> String {
    description.trim().to_string()
}

pub fn normalize_field(field_type: FieldType, value: &str) -> String {
    match field_type {
        FieldType::Name => normalize_name(value),
        FieldType::Phone => normalize_phone(value),
        FieldType::Address => normalize_address(value),
        FieldType::Date => normalize_date(value),
        FieldType::Description => normalize_description(value),
        FieldType::Other => value.to_string(),
    }
}

/// Normalizes the configured fields of `values`; other fields are copied as is.
pub fn normalize_values(values: &FieldValues, fields: &[FieldConfig]) -> FieldValues {
    let mut normalized = values.clone();
    for cfg in fields {
        if let Some(raw) = values.get(&cfg.field) {
            normalized.set(cfg.field.clone(), normalize_field(cfg.field_type, raw));
        }
    }
    normalized
}

/// Case-folded word tokens with punctuation stripped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
