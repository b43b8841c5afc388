// src/models/config.rs
//
// Typed matcher configuration. The JSON form (`RawMatcherConfig`) is loosely
// typed strings; `MatcherConfig::validate` turns it into enums once, so an
// unrecognized option fails before any query runs.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{MatchError, Result};
use crate::models::core::{Dataset, GROUP_ID_COLUMN, ID_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Name,
    Phone,
    Address,
    Date,
    Description,
    Other,
}

impl FromStr for FieldType {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(Self::Name),
            "phone" => Ok(Self::Phone),
            "address" => Ok(Self::Address),
            "date" => Ok(Self::Date),
            "description" => Ok(Self::Description),
            "other" => Ok(Self::Other),
            _ => Err(MatchError::InvalidFieldType {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMethod {
    JaroWinkler,
    Levenshtein,
    TfidfCosine,
    Jaccard,
}

impl FromStr for ComparisonMethod {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "jaro_winkler" => Ok(Self::JaroWinkler),
            "levenshtein" => Ok(Self::Levenshtein),
            "tfidf_cosine" => Ok(Self::TfidfCosine),
            "jaccard" => Ok(Self::Jaccard),
            _ => Err(MatchError::InvalidComparisonMethod {
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingMethod {
    Prefix,
    Block,
    SortedNeighborhood,
    Full,
}

impl FromStr for BlockingMethod {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "prefix" => Ok(Self::Prefix),
            "block" => Ok(Self::Block),
            "sorted_neighborhood" => Ok(Self::SortedNeighborhood),
            "full" => Ok(Self::Full),
            _ => Err(MatchError::UnsupportedBlockingMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for BlockingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Prefix => "prefix",
            Self::Block => "block",
            Self::SortedNeighborhood => "sorted_neighborhood",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldConfig {
    pub field: String,
    pub field_type: FieldType,
    pub comparison_method: ComparisonMethod,
}

impl FieldConfig {
    pub fn new(field: impl Into<String>, field_type: FieldType, comparison_method: ComparisonMethod) -> Self {
        Self {
            field: field.into(),
            field_type,
            comparison_method,
        }
    }
}

/// A single blocking key. Models support exactly one; see `MatcherConfig::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingConfig {
    pub field: String,
    pub method: BlockingMethod,
    pub threshold: usize,
}

impl BlockingConfig {
    pub fn new(field: impl Into<String>, method: BlockingMethod, threshold: usize) -> Self {
        Self {
            field: field.into(),
            method,
            threshold,
        }
    }

    pub fn full() -> Self {
        Self::new(String::new(), BlockingMethod::Full, 0)
    }

    fn validate(&self) -> Result<()> {
        let needs_threshold = matches!(
            self.method,
            BlockingMethod::Prefix | BlockingMethod::SortedNeighborhood
        );
        if needs_threshold && self.threshold == 0 {
            return Err(MatchError::InvalidBlockingThreshold {
                method: self.method.to_string(),
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Options for a single `predict` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictOptions {
    /// Drop candidates scoring zero. Both resolvers honour it, the flex
    /// resolver included, so MRR never ranks a zero-score candidate: a
    /// ground-truth match that scores 0 counts as not found rather than
    /// being credited at its position among the zero scores.
    pub only_matches: bool,
    /// Keep all original columns instead of just `id` and `score`.
    pub return_full_record: bool,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            only_matches: false,
            return_full_record: true,
        }
    }
}

impl PredictOptions {
    pub fn matches_only() -> Self {
        Self {
            only_matches: true,
            return_full_record: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFieldConfig {
    #[serde(rename = "type")]
    pub field_type: String,
    pub comparison_method: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawBlockingConfig {
    pub field: String,
    pub method: String,
    #[serde(default)]
    pub threshold: usize,
}

/// Matcher configuration exactly as it appears in a JSON config file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawMatcherConfig {
    #[serde(default)]
    pub ignored_columns: Vec<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, RawFieldConfig>,
    #[serde(default)]
    pub blocking: Vec<RawBlockingConfig>,
}

impl RawMatcherConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone)]
pub struct MatcherConfig {
    pub fields: Vec<FieldConfig>,
    pub blocking: BlockingConfig,
    pub ignored_columns: HashSet<String>,
}

impl MatcherConfig {
    pub fn new(fields: Vec<FieldConfig>, blocking: BlockingConfig, extra_ignored: &[&str]) -> Self {
        Self {
            fields,
            blocking,
            ignored_columns: ignored_column_set(extra_ignored.iter().map(|s| s.to_string())),
        }
    }

    /// Parses enumerated options and checks every referenced field against the
    /// dataset schema.
    ///
    /// Only the first blocking entry is used. Multiple blocking keys per model
    /// are out of scope; any further entries are ignored with a warning.
    pub fn validate(raw: &RawMatcherConfig, dataset: &Dataset) -> Result<Self> {
        let mut fields = Vec::with_capacity(raw.fields.len());
        for (field, cfg) in &raw.fields {
            let field_type = cfg.field_type.parse::<FieldType>()?;
            let comparison_method = cfg.comparison_method.parse::<ComparisonMethod>()?;
            fields.push(FieldConfig::new(field.clone(), field_type, comparison_method));
        }

        let blocking = match raw.blocking.split_first() {
            Some((first, rest)) => {
                if !rest.is_empty() {
                    warn!(
                        "Only one blocking key is supported; ignoring {} additional entries ({})",
                        rest.len(),
                        rest.iter().map(|b| b.field.as_str()).collect::<Vec<_>>().join(", ")
                    );
                }
                BlockingConfig::new(first.field.clone(), first.method.parse()?, first.threshold)
            }
            None => BlockingConfig::full(),
        };

        let config = Self {
            fields,
            blocking,
            ignored_columns: ignored_column_set(raw.ignored_columns.iter().cloned()),
        };
        config.check_against(dataset)?;
        Ok(config)
    }

    pub fn check_against(&self, dataset: &Dataset) -> Result<()> {
        for cfg in &self.fields {
            if !dataset.has_column(&cfg.field) {
                return Err(MatchError::UnknownField {
                    field: cfg.field.clone(),
                });
            }
        }
        self.blocking.validate()?;
        if self.blocking.method != BlockingMethod::Full && !dataset.has_column(&self.blocking.field) {
            return Err(MatchError::UnknownField {
                field: self.blocking.field.clone(),
            });
        }
        Ok(())
    }
}

/// Columns never used as matching features: identifiers, ground truth and
/// columns the core derives itself.
pub const INTERNAL_COLUMNS: [&str; 3] = ["matchify_hash", "predicted_group_id", "score"];

pub fn ignored_column_set(extra: impl IntoIterator<Item = String>) -> HashSet<String> {
    let mut set: HashSet<String> = extra.into_iter().collect();
    set.insert(ID_COLUMN.to_string());
    set.insert(GROUP_ID_COLUMN.to_string());
    for c in INTERNAL_COLUMNS {
        set.insert(c.to_string());
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{FieldValues, Record};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![Record::new(
            "1",
            FieldValues::new().with("name", "a").with("phone", "b"),
        )])
        .unwrap()
    }

    fn raw(json: &str) -> RawMatcherConfig {
        RawMatcherConfig::from_json_str(json).unwrap()
    }

    #[test]
    fn test_valid_config() {
        let config = MatcherConfig::validate(
            &raw(r#"{
                "fields": {
                    "name": {"type": "name", "comparison_method": "jaro_winkler"},
                    "phone": {"type": "phone", "comparison_method": "levenshtein"}
                },
                "blocking": [{"field": "name", "method": "prefix", "threshold": 3}]
            }"#),
            &dataset(),
        )
        .unwrap();
        assert_eq!(config.fields.len(), 2);
        assert_eq!(config.blocking, BlockingConfig::new("name", BlockingMethod::Prefix, 3));
        assert!(config.ignored_columns.contains("id"));
        assert!(config.ignored_columns.contains("group_id"));
    }

    #[test]
    fn test_unknown_options_rejected() {
        let ds = dataset();
        let err = MatcherConfig::validate(
            &raw(r#"{"fields": {"name": {"type": "nickname", "comparison_method": "jaro_winkler"}}}"#),
            &ds,
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidFieldType { .. }));

        let err = MatcherConfig::validate(
            &raw(r#"{"fields": {"name": {"type": "name", "comparison_method": "soundex"}}}"#),
            &ds,
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidComparisonMethod { .. }));

        let err = MatcherConfig::validate(
            &raw(r#"{"blocking": [{"field": "name", "method": "canopy", "threshold": 1}]}"#),
            &ds,
        )
        .unwrap_err();
        assert_eq!(
            err,
            MatchError::UnsupportedBlockingMethod {
                method: "canopy".to_string()
            }
        );
    }

    #[test]
    fn test_fields_must_exist_in_schema() {
        let err = MatcherConfig::validate(
            &raw(r#"{"fields": {"email": {"type": "other", "comparison_method": "jaccard"}}}"#),
            &dataset(),
        )
        .unwrap_err();
        assert_eq!(err, MatchError::UnknownField { field: "email".to_string() });
    }

    #[test]
    fn test_extra_blocking_entries_ignored() {
        let config = MatcherConfig::validate(
            &raw(r#"{"blocking": [
                {"field": "phone", "method": "block"},
                {"field": "name", "method": "prefix", "threshold": 2}
            ]}"#),
            &dataset(),
        )
        .unwrap();
        assert_eq!(config.blocking, BlockingConfig::new("phone", BlockingMethod::Block, 0));
    }

    #[test]
    fn test_missing_blocking_means_full() {
        let config = MatcherConfig::validate(&raw("{}"), &dataset()).unwrap();
        assert_eq!(config.blocking.method, BlockingMethod::Full);
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = MatcherConfig::validate(
            &raw(r#"{"blocking": [{"field": "name", "method": "sorted_neighborhood", "threshold": 0}]}"#),
            &dataset(),
        )
        .unwrap_err();
        assert!(matches!(err, MatchError::InvalidBlockingThreshold { .. }));
    }
}
