// src/resolver/mod.rs
//
// The two matching strategies behind one capability trait. Normalization,
// ranking and evaluation are shared helpers the models compose; nothing here
// relies on inherited state.

pub mod exact;
pub mod flex;

use std::collections::HashSet;

use crate::error::{MatchError, Result};
use crate::models::config::PredictOptions;
use crate::models::core::{Dataset, FieldValues};
use crate::models::matching::PredictionTable;
use crate::utils::logging::ResolverKind;

pub use exact::ExactMatchModel;
pub use flex::FlexMatchModel;

/// A matcher over one immutable dataset.
///
/// `Sync` so evaluation can fan rows out across threads against a shared
/// model; anything computed lazily must be forced in `prepare` first.
pub trait EntityResolver: Sync {
    fn kind(&self) -> ResolverKind;

    fn dataset(&self) -> &Dataset;

    /// Columns never compared: `id`, `group_id`, internal columns and any the
    /// caller asked to ignore.
    fn ignored_columns(&self) -> &HashSet<String>;

    /// Canonical form of a query record as the model compares it.
    fn preprocess(&self, values: &FieldValues) -> FieldValues;

    fn train(&mut self) -> Result<()>;

    fn predict(&self, query: &FieldValues, options: &PredictOptions) -> Result<PredictionTable>;

    /// Computes lazily cached state ahead of concurrent use.
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    fn fit_predict(&mut self, query: &FieldValues, options: &PredictOptions) -> Result<PredictionTable> {
        self.train()?;
        self.predict(query, options)
    }

    /// The stored record `id` with ignored columns dropped, ready to use as a query.
    fn lookup_record(&self, id: &str) -> Result<FieldValues> {
        lookup_values(self.dataset(), self.ignored_columns(), id)
    }
}

pub fn lookup_values(dataset: &Dataset, ignored: &HashSet<String>, id: &str) -> Result<FieldValues> {
    dataset
        .get(id)
        .map(|record| record.values.without(ignored))
        .ok_or_else(|| MatchError::RecordNotFound { id: id.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ignored_column_set;
    use crate::models::core::Record;

    #[test]
    fn test_lookup_drops_ignored_columns() {
        let dataset = Dataset::from_records(vec![Record::new(
            "7",
            FieldValues::new().with("name", "a").with("source_row", "12"),
        )])
        .unwrap();
        let ignored = ignored_column_set(["source_row".to_string()]);

        let values = lookup_values(&dataset, &ignored, "7").unwrap();
        assert_eq!(values.names().collect::<Vec<_>>(), vec!["name"]);

        let err = lookup_values(&dataset, &ignored, "8").unwrap_err();
        assert_eq!(err, MatchError::RecordNotFound { id: "8".to_string() });
    }
}
