// src/models/core.rs
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{MatchError, Result};

pub type RecordId = String;

pub const ID_COLUMN: &str = "id";
pub const GROUP_ID_COLUMN: &str = "group_id";

/// Ordered field name -> value mapping. Order follows the dataset schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValues(Vec<(String, String)>);

impl FieldValues {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Missing fields read as the empty string.
    pub fn value_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.0.push((field, value)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy without the given columns.
    pub fn without(&self, ignored: &HashSet<String>) -> FieldValues {
        FieldValues(
            self.0
                .iter()
                .filter(|(name, _)| !ignored.contains(name))
                .cloned()
                .collect(),
        )
    }

    /// Reorders (and pads with empty strings) to match `columns`; unknown keys are dropped.
    fn conform_to(&self, columns: &[String]) -> FieldValues {
        FieldValues(
            columns
                .iter()
                .map(|c| (c.clone(), self.value_or_empty(c).to_string()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = FieldValues::new();
        for (k, v) in iter {
            values.set(k, v);
        }
        values
    }
}

/// One row of a dataset. `group_id` is ground truth for evaluation only and
/// never takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub values: FieldValues,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, values: FieldValues) -> Self {
        Self {
            id: id.into(),
            group_id: None,
            values,
        }
    }

    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// An immutable table of records sharing one schema.
///
/// `columns` holds the feature columns in order; `id` and `group_id` are kept
/// on the records themselves. Nothing in the matching core mutates a dataset
/// after construction.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
    has_group_id: bool,
    position_by_id: HashMap<RecordId, usize>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>, has_group_id: bool) -> Result<Self> {
        let columns: Vec<String> = columns
            .into_iter()
            .filter(|c| c != ID_COLUMN && c != GROUP_ID_COLUMN)
            .collect();

        let mut position_by_id = HashMap::with_capacity(records.len());
        let mut conformed = Vec::with_capacity(records.len());
        for (position, record) in records.into_iter().enumerate() {
            if position_by_id.insert(record.id.clone(), position).is_some() {
                return Err(MatchError::DuplicateRecordId { id: record.id });
            }
            conformed.push(Record {
                values: record.values.conform_to(&columns),
                ..record
            });
        }

        Ok(Self {
            columns,
            records: conformed,
            has_group_id,
            position_by_id,
        })
    }

    /// Builds a dataset whose schema is taken from the first record.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let columns = records
            .first()
            .map(|r| r.values.names().map(str::to_string).collect())
            .unwrap_or_default();
        let has_group_id = records.iter().any(|r| r.group_id.is_some());
        Self::new(columns, records, has_group_id)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_at(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.position_by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.position(id).map(|p| &self.records[p])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_group_id(&self) -> bool {
        self.has_group_id
    }

    /// New dataset holding the rows at `positions`, in that order.
    pub fn subset(&self, positions: &[usize]) -> Dataset {
        let records: Vec<Record> = positions
            .iter()
            .filter_map(|&p| self.records.get(p).cloned())
            .collect();
        let position_by_id = records
            .iter()
            .enumerate()
            .map(|(p, r)| (r.id.clone(), p))
            .collect();
        Dataset {
            columns: self.columns.clone(),
            records,
            has_group_id: self.has_group_id,
            position_by_id,
        }
    }
}
