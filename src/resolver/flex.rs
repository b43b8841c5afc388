// src/resolver/flex.rs
use anyhow::Context;
use std::collections::HashSet;
use std::sync::Arc;

use crate::candidate_generation::BlockingIndex;
use crate::error::Result;
use crate::matching::normalize_values;
use crate::matching::ranking::rank_and_dedup;
use crate::matching::similarity::{SimilarityEngine, TrainedState};
use crate::models::config::{MatcherConfig, PredictOptions, RawMatcherConfig};
use crate::models::core::{Dataset, FieldValues};
use crate::models::matching::{MatchResult, PredictionTable};
use crate::resolver::EntityResolver;
use crate::utils::logging::{MatchingLogger, ResolverKind};

/// Fuzzy matcher: normalize, block on one key, score configured fields and rank.
#[derive(Debug)]
pub struct FlexMatchModel {
    dataset: Arc<Dataset>,
    config: MatcherConfig,
    engine: SimilarityEngine,
    /// Normalized snapshot of every record, in dataset order.
    normalized: Vec<FieldValues>,
    blocking: BlockingIndex,
    state: Option<TrainedState>,
    logger: MatchingLogger,
}

impl FlexMatchModel {
    /// Validates `config` against the dataset and builds the blocking index.
    pub fn new(dataset: Arc<Dataset>, config: MatcherConfig) -> Result<Self> {
        config.check_against(&dataset)?;
        let logger = MatchingLogger::new(ResolverKind::Flex);
        logger.log_start(dataset.len(), config.fields.len());

        logger.log_phase("Normalizing", Some(&format!("{} records", dataset.len())));
        let normalized: Vec<FieldValues> = dataset
            .records()
            .iter()
            .map(|r| normalize_values(&r.values.without(&config.ignored_columns), &config.fields))
            .collect();

        logger.log_blocking(&config.blocking);
        let blocking = BlockingIndex::build(&normalized, &config.blocking);

        Ok(Self {
            engine: SimilarityEngine::new(config.fields.clone()),
            dataset,
            config,
            normalized,
            blocking,
            state: None,
            logger,
        })
    }

    /// Builds a model from a JSON matcher configuration.
    pub fn from_json(dataset: Arc<Dataset>, json: &str) -> anyhow::Result<Self> {
        let raw = RawMatcherConfig::from_json_str(json).context("Failed to parse matcher configuration")?;
        let config = MatcherConfig::validate(&raw, &dataset)?;
        Ok(Self::new(dataset, config)?)
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn blocking_index(&self) -> &BlockingIndex {
        &self.blocking
    }

    pub fn trained_state(&self) -> Option<&TrainedState> {
        self.state.as_ref()
    }

    /// Fits TF-IDF state on `training` instead of the matched dataset.
    pub fn train_on(&mut self, training: &Dataset) -> Result<()> {
        self.config.check_against(training)?;
        self.logger
            .log_phase("Training", Some(&format!("{} training records", training.len())));
        let state = self.engine.train(training);
        for field in state.fitted_fields() {
            if state.vectorizer(field).is_some_and(|v| v.vocabulary_len() == 0) {
                self.logger.log_warning(&format!(
                    "TF-IDF vocabulary for '{}' is empty; every comparison on it will score 0",
                    field
                ));
            }
        }
        self.state = Some(state);
        Ok(())
    }

    pub fn with_trained_state(mut self, state: TrainedState) -> Self {
        self.state = Some(state);
        self
    }
}

impl EntityResolver for FlexMatchModel {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Flex
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn ignored_columns(&self) -> &HashSet<String> {
        &self.config.ignored_columns
    }

    fn preprocess(&self, values: &FieldValues) -> FieldValues {
        normalize_values(&values.without(&self.config.ignored_columns), &self.config.fields)
    }

    fn train(&mut self) -> Result<()> {
        let dataset = Arc::clone(&self.dataset);
        self.train_on(&dataset)
    }

    fn predict(&self, query: &FieldValues, options: &PredictOptions) -> Result<PredictionTable> {
        self.engine.check_trained(self.state.as_ref())?;

        let normalized_query = self.preprocess(query);
        let candidates = self.blocking.candidates(&normalized_query);

        let mut scored = Vec::with_capacity(candidates.len());
        for &position in candidates.positions() {
            let score = self
                .engine
                .score(&normalized_query, &self.normalized[position], self.state.as_ref())?;
            if options.only_matches && score <= 0.0 {
                continue;
            }
            scored.push(MatchResult::new(self.dataset.records()[position].id.clone(), score));
        }

        self.logger.log_debug(&format!(
            "{} candidates from blocking, {} scored rows kept",
            candidates.len(),
            scored.len()
        ));
        Ok(rank_and_dedup(scored, &self.dataset, options.return_full_record))
    }
}
