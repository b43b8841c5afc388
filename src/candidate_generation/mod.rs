// src/candidate_generation/mod.rs
pub mod blocking;

pub use blocking::{BlockingIndex, CandidateSet};
