// src/resolver/exact.rs
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::Arc;

use crate::clustering::{cluster, record_hash, ClusterIndex};
use crate::error::Result;
use crate::matching::ranking::rank_and_dedup;
use crate::models::config::{ignored_column_set, PredictOptions};
use crate::models::core::{Dataset, FieldValues};
use crate::models::matching::{ClusterAssignment, MatchResult, PredictionTable};
use crate::resolver::EntityResolver;
use crate::utils::logging::{MatchingLogger, ResolverKind};

/// Matches records whose non-ignored values are all identical.
///
/// The cluster index is built on first use and cached until the dataset is
/// replaced with `set_dataset`.
#[derive(Debug)]
pub struct ExactMatchModel {
    dataset: Arc<Dataset>,
    ignored_columns: HashSet<String>,
    clusters: OnceCell<ClusterIndex>,
    logger: MatchingLogger,
}

impl ExactMatchModel {
    pub fn new<I, S>(dataset: Arc<Dataset>, extra_ignored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let logger = MatchingLogger::new(ResolverKind::Exact);
        logger.log_start(dataset.len(), dataset.columns().len());
        Self {
            dataset,
            ignored_columns: ignored_column_set(extra_ignored.into_iter().map(Into::into)),
            clusters: OnceCell::new(),
            logger,
        }
    }

    pub fn cluster(&self) -> &ClusterIndex {
        self.clusters.get_or_init(|| {
            self.logger.log_phase("Clustering", Some(&format!("{} records", self.dataset.len())));
            cluster(&self.dataset, &self.ignored_columns)
        })
    }

    pub fn cluster_assignment(&self) -> &ClusterAssignment {
        self.cluster().assignment()
    }

    pub fn is_clustered(&self) -> bool {
        self.clusters.get().is_some()
    }

    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.dataset = dataset;
        self.clusters = OnceCell::new();
    }
}

impl EntityResolver for ExactMatchModel {
    fn kind(&self) -> ResolverKind {
        ResolverKind::Exact
    }

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn ignored_columns(&self) -> &HashSet<String> {
        &self.ignored_columns
    }

    fn preprocess(&self, values: &FieldValues) -> FieldValues {
        values.without(&self.ignored_columns)
    }

    /// Nothing to learn.
    fn train(&mut self) -> Result<()> {
        Ok(())
    }

    fn predict(&self, query: &FieldValues, options: &PredictOptions) -> Result<PredictionTable> {
        let index = self.cluster();
        let query_hash = record_hash(query, self.dataset.columns(), &self.ignored_columns);

        let scored: Vec<MatchResult> = self
            .dataset
            .records()
            .iter()
            .zip(index.hashes())
            .map(|(record, hash)| {
                let score = if *hash == query_hash { 1.0 } else { 0.0 };
                MatchResult::new(record.id.clone(), score)
            })
            .filter(|m| !options.only_matches || m.score > 0.0)
            .collect();

        self.logger
            .log_debug(&format!("{} exact matches for query", scored.iter().filter(|m| m.score > 0.0).count()));
        Ok(rank_and_dedup(scored, &self.dataset, options.return_full_record))
    }

    fn prepare(&self) -> Result<()> {
        self.cluster();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::Record;

    fn record(id: &str, name: &str, city: &str) -> Record {
        Record::new(id, FieldValues::new().with("name", name).with("city", city))
    }

    fn model() -> ExactMatchModel {
        let dataset = Dataset::from_records(vec![
            record("1", "Acme Corp", "Boston"),
            record("2", "Acme Corp", "Boston"),
            record("3", "ACME Corp", "Boston"),
            record("4", "Globex", "Springfield"),
            record("5", "Initech", "Austin"),
        ])
        .unwrap();
        ExactMatchModel::new(Arc::new(dataset), Vec::<String>::new())
    }

    #[test]
    fn test_five_record_scenario() {
        let model = model();
        let groups = model.cluster_assignment();
        assert_eq!(groups.group_of("1"), groups.group_of("2"));
        assert_ne!(groups.group_of("1"), groups.group_of("3"));

        let query = model.lookup_record("1").unwrap();
        let table = model.predict(&query, &PredictOptions::matches_only()).unwrap();
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(table.score_of("2"), Some(1.0));
        assert_eq!(table.score_of("3"), None);
        assert_eq!(table.columns, vec!["id", "score"]);
    }

    #[test]
    fn test_full_output_keeps_row_order_for_ties() {
        let model = model();
        let query = model.lookup_record("4").unwrap();
        let table = model.predict(&query, &PredictOptions::default()).unwrap();
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["4", "1", "2", "3", "5"]);
        assert_eq!(table.rows[0].values, vec!["Globex", "Springfield"]);
        assert_eq!(table.columns, vec!["id", "name", "city", "score"]);
    }

    #[test]
    fn test_predict_is_deterministic() {
        let model = model();
        let query = FieldValues::new().with("name", "Acme Corp").with("city", "Boston");
        let first = model.predict(&query, &PredictOptions::default()).unwrap();
        let second = model.predict(&query, &PredictOptions::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_cluster_cached_until_dataset_replaced() {
        let mut model = model();
        assert!(!model.is_clustered());
        model.prepare().unwrap();
        assert!(model.is_clustered());
        let before = model.cluster_assignment().clone();
        assert_eq!(&before, model.cluster_assignment());

        let replacement = Dataset::from_records(vec![record("9", "Solo", "Nowhere")]).unwrap();
        model.set_dataset(Arc::new(replacement));
        assert!(!model.is_clustered());
        assert_eq!(model.cluster_assignment().len(), 1);
    }

    #[test]
    fn test_ignored_columns_excluded_from_hash() {
        let dataset = Dataset::from_records(vec![
            Record::new("1", FieldValues::new().with("name", "a").with("source", "crm")),
            Record::new("2", FieldValues::new().with("name", "a").with("source", "erp")),
        ])
        .unwrap();
        let model = ExactMatchModel::new(Arc::new(dataset), ["source"]);
        let query = model.lookup_record("1").unwrap();
        let table = model.predict(&query, &PredictOptions::matches_only()).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_fit_predict_matches_predict() {
        let mut model = model();
        let query = model.lookup_record("5").unwrap();
        let fitted = model.fit_predict(&query, &PredictOptions::matches_only()).unwrap();
        assert_eq!(fitted.ids().collect::<Vec<_>>(), vec!["5"]);
    }
}
