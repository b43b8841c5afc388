// src/evaluation/mod.rs
pub mod mrr;

pub use mrr::{MrrEvaluator, MrrReport};
