// src/clustering/mod.rs
pub mod exact_match;

pub use exact_match::{cluster, record_hash, ClusterIndex};
