// src/evaluation/mrr.rs
use indicatif::ProgressBar;
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::thread;

use crate::error::{MatchError, Result};
use crate::models::config::PredictOptions;
use crate::resolver::EntityResolver;
use crate::utils::logging::MatchingLogger;
use crate::utils::progress_config::ProgressConfig;

/// Aggregate of one MRR run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MrrReport {
    pub mrr: f64,
    /// Rows with at least one ground-truth match.
    pub evaluated_rows: usize,
    /// Rows skipped because no other record shares their group.
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    sum: f64,
    evaluated: usize,
    skipped: usize,
}

impl Tally {
    fn add(&mut self, contribution: Option<f64>) {
        match contribution {
            Some(rr) => {
                self.sum += rr;
                self.evaluated += 1;
            }
            None => self.skipped += 1,
        }
    }

    fn merge(self, other: Tally) -> Tally {
        Tally {
            sum: self.sum + other.sum,
            evaluated: self.evaluated + other.evaluated,
            skipped: self.skipped + other.skipped,
        }
    }

    fn report(self) -> MrrReport {
        MrrReport {
            mrr: if self.evaluated == 0 {
                0.0
            } else {
                self.sum / self.evaluated as f64
            },
            evaluated_rows: self.evaluated,
            skipped_rows: self.skipped,
        }
    }
}

/// Mean reciprocal rank of a model's predictions against `group_id` ground truth.
pub struct MrrEvaluator<'a, R: EntityResolver + ?Sized> {
    model: &'a R,
    /// group id -> dataset positions of its members
    members: HashMap<&'a str, Vec<usize>>,
    progress: ProgressConfig,
    logger: MatchingLogger,
}

impl<'a, R: EntityResolver + ?Sized> MrrEvaluator<'a, R> {
    pub fn new(model: &'a R) -> Result<Self> {
        let dataset = model.dataset();
        if !dataset.has_group_id() {
            return Err(MatchError::MissingGroundTruthColumn { operation: "MRR" });
        }

        let mut members: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (position, record) in dataset.records().iter().enumerate() {
            if let Some(group) = record.group_id.as_deref() {
                members.entry(group).or_default().push(position);
            }
        }

        Ok(Self {
            model,
            members,
            progress: ProgressConfig::from_env(),
            logger: MatchingLogger::new(model.kind()),
        })
    }

    pub fn with_progress(mut self, progress: ProgressConfig) -> Self {
        self.progress = progress;
        self
    }

    /// Ids of the other records in `id`'s ground-truth group.
    pub fn ground_truth(&self, id: &str) -> Result<Vec<&'a str>> {
        let dataset = self.model.dataset();
        let record = dataset
            .get(id)
            .ok_or_else(|| MatchError::RecordNotFound { id: id.to_string() })?;
        let Some(group) = record.group_id.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(self
            .members
            .get(group)
            .into_iter()
            .flatten()
            .filter_map(|&p| dataset.record_at(p))
            .map(|r| r.id.as_str())
            .filter(|other| *other != id)
            .collect())
    }

    /// Reciprocal rank for one row, `None` when the row has no ground truth.
    pub fn reciprocal_rank(&self, position: usize) -> Result<Option<f64>> {
        let dataset = self.model.dataset();
        let record = dataset
            .record_at(position)
            .ok_or_else(|| MatchError::RecordNotFound {
                id: format!("#{}", position),
            })?;

        let truth = self.ground_truth(&record.id)?;
        if truth.is_empty() {
            return Ok(None);
        }

        let query = self.model.lookup_record(&record.id)?;
        let predicted = self.model.predict(&query, &PredictOptions::matches_only())?;
        let rank = predicted
            .ids()
            .filter(|id| *id != record.id)
            .position(|id| truth.iter().any(|t| *t == id));

        Ok(Some(rank.map_or(0.0, |p| 1.0 / (1.0 + p as f64))))
    }

    pub fn mrr(&self) -> Result<f64> {
        Ok(self.evaluate()?.mrr)
    }

    /// Sequential pass over every row.
    pub fn evaluate(&self) -> Result<MrrReport> {
        let total = self.model.dataset().len();
        self.logger.log_phase("Evaluating MRR", Some(&format!("{} rows", total)));
        let bar = self.progress.create_progress_bar(total as u64, "Calculating MRR");

        let tally = self.evaluate_range(0..total, &bar)?;

        bar.finish_and_clear();
        let report = tally.report();
        self.logger
            .log_evaluation_summary(report.mrr, report.evaluated_rows, report.skipped_rows);
        Ok(report)
    }

    pub fn mrr_parallel(&self, workers: usize) -> Result<f64> {
        Ok(self.evaluate_parallel(workers)?.mrr)
    }

    /// Same result as `evaluate`, with rows split into contiguous chunks
    /// across `workers` threads sharing the read-only model.
    pub fn evaluate_parallel(&self, workers: usize) -> Result<MrrReport> {
        let total = self.model.dataset().len();
        let workers = workers.clamp(1, total.max(1));
        self.model.prepare()?;
        self.logger.log_phase(
            "Evaluating MRR",
            Some(&format!("{} rows on {} workers", total, workers)),
        );
        let bar = self.progress.create_progress_bar(total as u64, "Calculating MRR");

        let chunk = total.div_ceil(workers).max(1);
        let partials: Vec<Result<Tally>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..total)
                .step_by(chunk)
                .map(|start| {
                    let end = (start + chunk).min(total);
                    let bar = &bar;
                    scope.spawn(move || self.evaluate_range(start..end, bar))
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        });

        let mut tally = Tally::default();
        for partial in partials {
            tally = tally.merge(partial?);
        }

        bar.finish_and_clear();
        let report = tally.report();
        self.logger
            .log_evaluation_summary(report.mrr, report.evaluated_rows, report.skipped_rows);
        Ok(report)
    }

    fn evaluate_range(&self, rows: std::ops::Range<usize>, bar: &ProgressBar) -> Result<Tally> {
        let mut tally = Tally::default();
        for position in rows {
            tally.add(self.reciprocal_rank(position)?);
            bar.inc(1);
            let done = bar.position() as usize;
            if self.progress.should_log_row(done) {
                info!("MRR progress: {}/{} rows", done, self.model.dataset().len());
            }
        }
        Ok(tally)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::{BlockingConfig, ComparisonMethod, FieldConfig, FieldType, MatcherConfig};
    use crate::models::core::{Dataset, FieldValues, Record};
    use crate::resolver::{ExactMatchModel, FlexMatchModel};
    use std::sync::Arc;

    fn quiet() -> ProgressConfig {
        ProgressConfig {
            enabled: false,
            refresh_rate_ms: 100,
            log_every: 0,
        }
    }

    fn grouped(rows: &[(&str, &str, Option<&str>)]) -> Arc<Dataset> {
        let records = rows
            .iter()
            .map(|(id, name, group)| {
                let record = Record::new(*id, FieldValues::new().with("name", *name));
                match group {
                    Some(g) => record.with_group(*g),
                    None => record,
                }
            })
            .collect();
        Arc::new(Dataset::from_records(records).unwrap())
    }

    fn levenshtein_model(dataset: Arc<Dataset>) -> FlexMatchModel {
        let config = MatcherConfig::new(
            vec![FieldConfig::new("name", FieldType::Other, ComparisonMethod::Levenshtein)],
            BlockingConfig::full(),
            &[],
        );
        FlexMatchModel::new(dataset, config).unwrap()
    }

    #[test]
    fn test_top_candidate_is_duplicate() {
        let dataset = grouped(&[
            ("1", "john smith", Some("a")),
            ("2", "john smith", Some("a")),
            ("3", "mary jones", Some("b")),
            ("4", "mary jones", Some("b")),
        ]);
        let model = levenshtein_model(dataset);
        let evaluator = MrrEvaluator::new(&model).unwrap().with_progress(quiet());
        assert_eq!(evaluator.mrr().unwrap(), 1.0);
    }

    #[test]
    fn test_duplicate_always_second() {
        // Each record's nearest neighbour belongs to the other group; its
        // duplicate is one edit further away.
        let dataset = grouped(&[
            ("a1", "aaa", Some("A")),
            ("b1", "baa", Some("B")),
            ("a2", "abb", Some("A")),
            ("b2", "bbb", Some("B")),
        ]);
        let model = levenshtein_model(dataset);
        let evaluator = MrrEvaluator::new(&model).unwrap().with_progress(quiet());
        let report = evaluator.evaluate().unwrap();
        assert_eq!(report.mrr, 0.5);
        assert_eq!(report.evaluated_rows, 4);
    }

    #[test]
    fn test_rows_without_ground_truth_skipped() {
        let dataset = grouped(&[
            ("1", "acme", Some("g1")),
            ("2", "acme", Some("g1")),
            ("3", "ACME", Some("g1")),
            ("4", "globex", Some("g2")),
            ("5", "initech", None),
        ]);
        let model = ExactMatchModel::new(dataset, Vec::<String>::new());
        let evaluator = MrrEvaluator::new(&model).unwrap().with_progress(quiet());
        let report = evaluator.evaluate().unwrap();
        // rows 1 and 2 find each other; row 3 has ground truth but no prediction
        assert_eq!(report.evaluated_rows, 3);
        assert_eq!(report.skipped_rows, 2);
        assert!((report.mrr - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(evaluator.reciprocal_rank(2).unwrap(), Some(0.0));
        assert_eq!(evaluator.reciprocal_rank(4).unwrap(), None);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dataset = grouped(&[
            ("a1", "aaa", Some("A")),
            ("b1", "baa", Some("B")),
            ("a2", "abb", Some("A")),
            ("b2", "bbb", Some("B")),
            ("c1", "zzz", Some("C")),
            ("c2", "zzz", Some("C")),
            ("d1", "qqq", None),
        ]);
        let model = levenshtein_model(dataset);
        let evaluator = MrrEvaluator::new(&model).unwrap().with_progress(quiet());
        let sequential = evaluator.evaluate().unwrap();
        for workers in [1, 2, 3, 16] {
            assert_eq!(evaluator.evaluate_parallel(workers).unwrap(), sequential);
        }

        let exact = ExactMatchModel::new(grouped(&[("1", "x", Some("g")), ("2", "x", Some("g"))]), Vec::<String>::new());
        let evaluator = MrrEvaluator::new(&exact).unwrap().with_progress(quiet());
        assert_eq!(evaluator.mrr_parallel(2).unwrap(), 1.0);
        assert!(exact.is_clustered());
    }

    #[test]
    fn test_requires_group_id() {
        let dataset = grouped(&[("1", "x", None)]);
        let model = ExactMatchModel::new(dataset, Vec::<String>::new());
        let err = MrrEvaluator::new(&model).err().unwrap();
        assert_eq!(err, MatchError::MissingGroundTruthColumn { operation: "MRR" });
    }

    #[test]
    fn test_ground_truth_lookup() {
        let dataset = grouped(&[("1", "x", Some("g")), ("2", "y", Some("g")), ("3", "z", Some("h"))]);
        let model = ExactMatchModel::new(dataset, Vec::<String>::new());
        let evaluator = MrrEvaluator::new(&model).unwrap();
        assert_eq!(evaluator.ground_truth("1").unwrap(), vec!["2"]);
        assert!(evaluator.ground_truth("3").unwrap().is_empty());
        assert_eq!(
            evaluator.ground_truth("9").unwrap_err(),
            MatchError::RecordNotFound { id: "9".to_string() }
        );
    }
}
