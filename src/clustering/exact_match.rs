// src/clustering/exact_match.rs
use log::debug;
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::core::{Dataset, FieldValues};
use crate::models::matching::ClusterAssignment;

/// Stable content hash of a record over the non-ignored schema columns.
///
/// Each column contributes `name:len:value`, in schema order, so two records
/// hash equal exactly when every compared value is equal. A column missing
/// from `values` hashes as the empty string.
pub fn record_hash(values: &FieldValues, columns: &[String], ignored: &HashSet<String>) -> String {
    let mut hasher = Sha256::new();
    for column in columns.iter().filter(|c| !ignored.contains(*c)) {
        let value = values.value_or_empty(column);
        hasher.update(format!("{}:{}:{}", column, value.len(), value).as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Per-row hashes plus the dense group id derived from them.
#[derive(Debug, Clone)]
pub struct ClusterIndex {
    hashes: Vec<String>,
    assignment: ClusterAssignment,
}

impl ClusterIndex {
    pub fn hashes(&self) -> &[String] {
        &self.hashes
    }

    pub fn hash_at(&self, position: usize) -> Option<&str> {
        self.hashes.get(position).map(String::as_str)
    }

    pub fn assignment(&self) -> &ClusterAssignment {
        &self.assignment
    }

    /// Record ids per group, ordered by group id then row order.
    pub fn groups<'a>(&self, dataset: &'a Dataset) -> Vec<Vec<&'a str>> {
        let mut groups: Vec<Vec<&'a str>> = vec![Vec::new(); self.assignment.group_count()];
        for record in dataset.records() {
            if let Some(group) = self.assignment.group_of(&record.id) {
                groups[group].push(record.id.as_str());
            }
        }
        groups
    }
}

/// Hashes every record and assigns each distinct hash a dense group id
/// (0-based rank of the hash in sorted order). Equal hashes share a group.
pub fn cluster(dataset: &Dataset, ignored: &HashSet<String>) -> ClusterIndex {
    let hashes: Vec<String> = dataset
        .records()
        .iter()
        .map(|r| record_hash(&r.values, dataset.columns(), ignored))
        .collect();

    let distinct: BTreeSet<&str> = hashes.iter().map(String::as_str).collect();
    let rank: HashMap<&str, usize> = distinct.iter().enumerate().map(|(i, h)| (*h, i)).collect();

    let groups = dataset
        .records()
        .iter()
        .zip(&hashes)
        .map(|(record, hash)| (record.id.clone(), rank[hash.as_str()]))
        .collect();

    debug!(
        "Clustered {} records into {} exact-match groups",
        dataset.len(),
        distinct.len()
    );

    ClusterIndex {
        hashes,
        assignment: ClusterAssignment::new(groups),
    }
}
