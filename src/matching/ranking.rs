// src/matching/ranking.rs
use std::collections::HashSet;

use crate::models::core::{Dataset, GROUP_ID_COLUMN, ID_COLUMN};
use crate::models::matching::{MatchResult, Prediction, PredictionTable};

pub const SCORE_COLUMN: &str = "score";

/// Sorts scored candidates by descending score (stable, so ties keep their
/// input order), keeps the best-scoring occurrence of each id and joins the
/// candidate's original values back on. `dataset` is only read.
pub fn rank_and_dedup(mut scored: Vec<MatchResult>, dataset: &Dataset, return_full_record: bool) -> PredictionTable {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut seen: HashSet<&str> = HashSet::with_capacity(scored.len());
    let mut rows = Vec::with_capacity(scored.len());
    for result in &scored {
        if !seen.insert(result.record_id.as_str()) {
            continue;
        }
        let Some(record) = dataset.get(&result.record_id) else {
            continue;
        };
        rows.push(if return_full_record {
            Prediction {
                id: record.id.clone(),
                group_id: record.group_id.clone(),
                values: record.values.iter().map(|(_, v)| v.to_string()).collect(),
                score: result.score,
            }
        } else {
            Prediction {
                id: record.id.clone(),
                group_id: None,
                values: Vec::new(),
                score: result.score,
            }
        });
    }

    PredictionTable {
        columns: header(dataset, return_full_record),
        rows,
    }
}

fn header(dataset: &Dataset, return_full_record: bool) -> Vec<String> {
    let mut columns = vec![ID_COLUMN.to_string()];
    if return_full_record {
        if dataset.has_group_id() {
            columns.push(GROUP_ID_COLUMN.to_string());
        }
        columns.extend(dataset.columns().iter().cloned());
    }
    columns.push(SCORE_COLUMN.to_string());
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::core::{FieldValues, Record};

    fn dataset() -> Dataset {
        Dataset::from_records(vec![
            Record::new("a", FieldValues::new().with("name", "alpha")).with_group("g1"),
            Record::new("b", FieldValues::new().with("name", "beta")).with_group("g1"),
            Record::new("c", FieldValues::new().with("name", "gamma")),
        ])
        .unwrap()
    }

    #[test]
    fn test_sorted_and_deduplicated() {
        let ds = dataset();
        let table = rank_and_dedup(
            vec![
                MatchResult::new("c", 0.2),
                MatchResult::new("a", 0.5),
                MatchResult::new("c", 0.9),
                MatchResult::new("b", 0.5),
            ],
            &ds,
            true,
        );
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["c", "a", "b"]);
        assert_eq!(table.score_of("c"), Some(0.9));
        assert_eq!(table.columns, vec!["id", "group_id", "name", "score"]);
        assert_eq!(table.rows[1].values, vec!["alpha"]);
        assert_eq!(table.rows[1].group_id.as_deref(), Some("g1"));
    }

    #[test]
    fn test_ids_only_projection() {
        let ds = dataset();
        let table = rank_and_dedup(vec![MatchResult::new("b", 1.0)], &ds, false);
        assert_eq!(table.columns, vec!["id", "score"]);
        assert!(table.rows[0].values.is_empty());
        assert!(table.rows[0].group_id.is_none());
    }

    #[test]
    fn test_source_dataset_untouched() {
        let ds = dataset();
        let before = ds.records().to_vec();
        let _ = rank_and_dedup(vec![MatchResult::new("a", 1.0)], &ds, true);
        assert_eq!(ds.records(), before.as_slice());
    }
}
