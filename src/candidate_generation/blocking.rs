// src/candidate_generation/blocking.rs
//
// Candidate generation for a single query record. A model carries exactly
// one blocking key; the index is built once from the normalized dataset and
// reused for every query.

use log::debug;
use std::collections::HashMap;

use crate::models::config::{BlockingConfig, BlockingMethod};
use crate::models::core::{Dataset, FieldValues, RecordId};

/// Dataset row positions selected for one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    positions: Vec<usize>,
}

impl CandidateSet {
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, position: usize) -> bool {
        self.positions.contains(&position)
    }

    pub fn ids<'a>(&'a self, dataset: &'a Dataset) -> impl Iterator<Item = &'a RecordId> + 'a {
        self.positions
            .iter()
            .filter_map(|&p| dataset.record_at(p).map(|r| &r.id))
    }
}

#[derive(Debug, Clone)]
enum BlockingStrategy {
    Full { len: usize },
    /// `block` and `prefix`: equality on the derived key column.
    Equality { index: HashMap<String, Vec<usize>> },
    /// Keys with their row positions, sorted by key (stable).
    SortedNeighborhood { sorted: Vec<(String, usize)> },
}

#[derive(Debug, Clone)]
pub struct BlockingIndex {
    config: BlockingConfig,
    /// Derived blocking key per row (the prefix column for `prefix`).
    keys: Vec<String>,
    strategy: BlockingStrategy,
}

impl BlockingIndex {
    /// `normalized` holds the dataset rows after field normalization, in dataset order.
    pub fn build(normalized: &[FieldValues], config: &BlockingConfig) -> Self {
        let keys: Vec<String> = match config.method {
            BlockingMethod::Full => Vec::new(),
            _ => normalized
                .iter()
                .map(|values| blocking_key(config, values.value_or_empty(&config.field)))
                .collect(),
        };

        let strategy = match config.method {
            BlockingMethod::Full => BlockingStrategy::Full { len: normalized.len() },
            BlockingMethod::Block | BlockingMethod::Prefix => {
                let mut index: HashMap<String, Vec<usize>> = HashMap::new();
                for (position, key) in keys.iter().enumerate() {
                    index.entry(key.clone()).or_default().push(position);
                }
                BlockingStrategy::Equality { index }
            }
            BlockingMethod::SortedNeighborhood => {
                let mut sorted: Vec<(String, usize)> = keys.iter().cloned().zip(0..).collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                BlockingStrategy::SortedNeighborhood { sorted }
            }
        };

        debug!(
            "Built {} blocking index on '{}' over {} rows",
            config.method,
            config.field,
            normalized.len()
        );

        Self {
            config: config.clone(),
            keys,
            strategy,
        }
    }

    pub fn config(&self) -> &BlockingConfig {
        &self.config
    }

    /// The derived key column, one entry per dataset row (empty for `full`).
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn key_for(&self, normalized_query: &FieldValues) -> String {
        blocking_key(&self.config, normalized_query.value_or_empty(&self.config.field))
    }

    pub fn candidates(&self, normalized_query: &FieldValues) -> CandidateSet {
        let positions = match &self.strategy {
            BlockingStrategy::Full { len } => (0..*len).collect(),
            BlockingStrategy::Equality { index } => index
                .get(&self.key_for(normalized_query))
                .cloned()
                .unwrap_or_default(),
            BlockingStrategy::SortedNeighborhood { sorted } => {
                let key = self.key_for(normalized_query);
                let insert_at = sorted.partition_point(|(k, _)| k.as_str() < key.as_str());
                let start = insert_at.saturating_sub(self.config.threshold);
                let end = insert_at.saturating_add(self.config.threshold).min(sorted.len());
                sorted[start..end].iter().map(|(_, p)| *p).collect()
            }
        };
        CandidateSet { positions }
    }
}

fn blocking_key(config: &BlockingConfig, normalized_value: &str) -> String {
    match config.method {
        BlockingMethod::Prefix => normalized_value.chars().take(config.threshold).collect(),
        _ => normalized_value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(names: &[&str]) -> Vec<FieldValues> {
        names
            .iter()
            .map(|n| FieldValues::new().with("name", *n))
            .collect()
    }

    fn query(name: &str) -> FieldValues {
        FieldValues::new().with("name", name)
    }

    #[test]
    fn test_full_returns_everything() {
        let index = BlockingIndex::build(&rows(&["a", "b", "c"]), &BlockingConfig::full());
        assert_eq!(index.candidates(&query("zzz")).positions(), &[0, 1, 2]);
    }

    #[test]
    fn test_block_is_exact_equality() {
        let index = BlockingIndex::build(
            &rows(&["seattle", "tacoma", "seattle", "Seattle"]),
            &BlockingConfig::new("name", BlockingMethod::Block, 0),
        );
        assert_eq!(index.candidates(&query("seattle")).positions(), &[0, 2]);
        assert!(index.candidates(&query("spokane")).is_empty());
    }

    #[test]
    fn test_prefix_blocking_soundness() {
        let names = ["smith john", "smithers ann", "jones bob", "smyth jane", "jonas carl", "smi"];
        let data = rows(&names);
        let index = BlockingIndex::build(&data, &BlockingConfig::new("name", BlockingMethod::Prefix, 3));
        assert_eq!(index.keys()[0], "smi");

        let candidates = index.candidates(&query("smitty pat"));
        assert_eq!(candidates.positions(), &[0, 1, 5]);
        for (position, name) in names.iter().enumerate() {
            if !candidates.contains(position) {
                assert!(!name.starts_with("smi"));
            }
        }
        assert!(!candidates.contains(2));
        assert!(!candidates.contains(4));
    }

    #[test]
    fn test_prefix_shorter_than_threshold() {
        let index = BlockingIndex::build(&rows(&["ab", "abc", ""]), &BlockingConfig::new("name", BlockingMethod::Prefix, 3));
        assert_eq!(index.candidates(&query("ab")).positions(), &[0]);
        assert_eq!(index.candidates(&query("")).positions(), &[2]);
    }

    #[test]
    fn test_sorted_neighborhood_window() {
        // sorted: a(1) c(3) e(0) g(4) i(2)
        let index = BlockingIndex::build(
            &rows(&["e", "a", "i", "c", "g"]),
            &BlockingConfig::new("name", BlockingMethod::SortedNeighborhood, 1),
        );
        // "f" inserts between e and g
        assert_eq!(index.candidates(&query("f")).positions(), &[0, 4]);
        // "e" inserts before e (left insertion point)
        assert_eq!(index.candidates(&query("e")).positions(), &[3, 0]);
    }

    #[test]
    fn test_sorted_neighborhood_clipped_to_bounds() {
        let index = BlockingIndex::build(
            &rows(&["b", "c", "d"]),
            &BlockingConfig::new("name", BlockingMethod::SortedNeighborhood, 2),
        );
        assert_eq!(index.candidates(&query("a")).positions(), &[0, 1]);
        assert_eq!(index.candidates(&query("z")).positions(), &[1, 2]);
    }

    #[test]
    fn test_sorted_neighborhood_huge_threshold_is_full_window() {
        let index = BlockingIndex::build(
            &rows(&["b", "c", "a"]),
            &BlockingConfig::new("name", BlockingMethod::SortedNeighborhood, usize::MAX),
        );
        assert_eq!(index.candidates(&query("b")).positions(), &[2, 0, 1]);
        assert_eq!(index.candidates(&query("zzz")).positions(), &[2, 0, 1]);
    }
}
