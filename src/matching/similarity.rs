// src/matching/similarity.rs
use log::debug;
use std::collections::{HashMap, HashSet};
use strsim::{jaro_winkler, levenshtein};

use crate::error::{MatchError, Result};
use crate::matching::tfidf::TfidfVectorizer;
use crate::matching::{normalize_field, tokenize};
use crate::models::config::{ComparisonMethod, FieldConfig};
use crate::models::core::{Dataset, FieldValues};

/// Per-field state produced by `SimilarityEngine::train`. Comparisons that
/// need it receive it explicitly.
#[derive(Debug, Clone, Default)]
pub struct TrainedState {
    vectorizers: HashMap<String, TfidfVectorizer>,
}

impl TrainedState {
    pub fn vectorizer(&self, field: &str) -> Option<&TfidfVectorizer> {
        self.vectorizers.get(field)
    }

    pub fn is_fitted(&self, field: &str) -> bool {
        self.vectorizers.contains_key(field)
    }

    pub fn fitted_fields(&self) -> impl Iterator<Item = &str> {
        self.vectorizers.keys().map(String::as_str)
    }
}

/// Rescales `score` from [min_score, max_score] to [0, 1].
///
/// A degenerate range (no configured fields) yields 1. Every multi-field
/// aggregation goes through here.
pub fn normalize_score(score: f64, min_score: f64, max_score: f64) -> f64 {
    if max_score == min_score {
        return 1.0;
    }
    ((score - min_score) / (max_score - min_score)).clamp(0.0, 1.0)
}

pub fn jaro_winkler_similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b)
}

/// `1 - edit_distance / max(len(a), len(b), 1)`, lengths in chars.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count()).max(1);
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Token-set Jaccard. Two empty token sets carry no signal and score 0.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<String> = tokenize(a).into_iter().collect();
    let tokens_b: HashSet<String> = tokenize(b).into_iter().collect();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    tokens_a.intersection(&tokens_b).count() as f64 / union as f64
}

/// Compares two normalized values of `field`.
///
/// An empty value on either side is a failed or missing normalization and
/// scores 0 regardless of method.
pub fn compare(
    a: &str,
    b: &str,
    method: ComparisonMethod,
    field: &str,
    state: Option<&TrainedState>,
) -> Result<f64> {
    if method == ComparisonMethod::TfidfCosine && !state.is_some_and(|s| s.is_fitted(field)) {
        return Err(MatchError::VectorizerNotFitted {
            field: field.to_string(),
        });
    }
    if a.is_empty() || b.is_empty() {
        return Ok(0.0);
    }

    let similarity = match method {
        ComparisonMethod::JaroWinkler => jaro_winkler_similarity(a, b),
        ComparisonMethod::Levenshtein => levenshtein_similarity(a, b),
        ComparisonMethod::Jaccard => jaccard_similarity(a, b),
        ComparisonMethod::TfidfCosine => state
            .and_then(|s| s.vectorizer(field))
            .map_or(0.0, |v| v.cosine_similarity(a, b)),
    };
    Ok(similarity.clamp(0.0, 1.0))
}

/// Scores candidate pairs over a fixed set of configured fields.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    fields: Vec<FieldConfig>,
}

impl SimilarityEngine {
    pub fn new(fields: Vec<FieldConfig>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn requires_training(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.comparison_method == ComparisonMethod::TfidfCosine)
    }

    /// Fits one TF-IDF vectorizer per `tfidf_cosine` field over the
    /// non-empty normalized values of `dataset`.
    pub fn train(&self, dataset: &Dataset) -> TrainedState {
        let mut vectorizers = HashMap::new();
        for cfg in &self.fields {
            if cfg.comparison_method != ComparisonMethod::TfidfCosine {
                continue;
            }
            let documents: Vec<String> = dataset
                .records()
                .iter()
                .map(|r| normalize_field(cfg.field_type, r.values.value_or_empty(&cfg.field)))
                .filter(|v| !v.is_empty())
                .collect();
            let vectorizer = TfidfVectorizer::fit(documents.iter().map(String::as_str));
            debug!(
                "Fitted TF-IDF vectorizer for '{}' over {} documents ({} terms)",
                cfg.field,
                documents.len(),
                vectorizer.vocabulary_len()
            );
            vectorizers.insert(cfg.field.clone(), vectorizer);
        }
        TrainedState { vectorizers }
    }

    /// Fails fast when a `tfidf_cosine` field has no fitted vectorizer.
    pub fn check_trained(&self, state: Option<&TrainedState>) -> Result<()> {
        for cfg in &self.fields {
            if cfg.comparison_method == ComparisonMethod::TfidfCosine
                && !state.is_some_and(|s| s.is_fitted(&cfg.field))
            {
                return Err(MatchError::VectorizerNotFitted {
                    field: cfg.field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Sum of per-field similarities, normalized over [0, number of fields].
    pub fn score(&self, query: &FieldValues, candidate: &FieldValues, state: Option<&TrainedState>) -> Result<f64> {
        let mut total = 0.0;
        for cfg in &self.fields {
            total += compare(
                query.value_or_empty(&cfg.field),
                candidate.value_or_empty(&cfg.field),
                cfg.comparison_method,
                &cfg.field,
                state,
            )?;
        }
        Ok(normalize_score(total, 0.0, self.fields.len() as f64))
    }
}
