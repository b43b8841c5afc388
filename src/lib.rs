// src/lib.rs
pub mod candidate_generation;
pub mod clustering;
pub mod error;
pub mod evaluation;
pub mod matching;
pub mod models;
pub mod resolver;
pub mod utils;

pub use error::MatchError;
pub use evaluation::{MrrEvaluator, MrrReport};
pub use models::config::{BlockingConfig, FieldConfig, MatcherConfig, PredictOptions};
pub use models::core::{Dataset, FieldValues, Record, RecordId};
pub use models::matching::{ClusterAssignment, MatchResult, PredictionTable};
pub use resolver::{EntityResolver, ExactMatchModel, FlexMatchModel};
