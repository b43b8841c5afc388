// src/models/matching.rs
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::core::RecordId;

/// A scored candidate, `score` in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub record_id: RecordId,
    pub score: f64,
}

impl MatchResult {
    pub fn new(record_id: impl Into<RecordId>, score: f64) -> Self {
        Self {
            record_id: record_id.into(),
            score,
        }
    }
}

/// One row of a prediction table. `values` is empty when the caller asked
/// for ids only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    pub score: f64,
}

/// Ranked, deduplicated output of `predict`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionTable {
    /// Header: `id`, then the original columns when full records were requested, then `score`.
    pub columns: Vec<String>,
    pub rows: Vec<Prediction>,
}

impl PredictionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.id.as_str())
    }

    pub fn top(&self, k: usize) -> PredictionTable {
        PredictionTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(k).cloned().collect(),
        }
    }

    pub fn score_of(&self, id: &str) -> Option<f64> {
        self.rows.iter().find(|r| r.id == id).map(|r| r.score)
    }
}

/// Dense predicted group id per record, fixed for one clustering run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    groups: HashMap<RecordId, usize>,
}

impl ClusterAssignment {
    pub fn new(groups: HashMap<RecordId, usize>) -> Self {
        Self { groups }
    }

    pub fn group_of(&self, id: &str) -> Option<usize> {
        self.groups.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.values().max().map_or(0, |max| max + 1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.groups.iter().map(|(id, g)| (id.as_str(), *g))
    }
}
