// src/utils/data_splitter.rs
use anyhow::{ensure, Result};
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};

use crate::error::MatchError;
use crate::models::core::Dataset;

#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub test: Dataset,
    pub dev: Dataset,
}

/// Group-aware train/test/dev split.
///
/// Distinct ground-truth groups are shuffled with a seeded RNG; the first
/// `ceil(groups * test_size)` go to test, the next `ceil(groups * dev_size)`
/// to dev and the rest to train. All records of a group land in the same
/// partition. Records without a group id go to train.
pub fn split_by_group(dataset: &Dataset, test_size: f64, dev_size: f64, seed: u64) -> Result<DatasetSplit> {
    if !dataset.has_group_id() {
        return Err(MatchError::MissingGroundTruthColumn {
            operation: "split_by_group",
        }
        .into());
    }
    ensure!(
        (0.0..1.0).contains(&test_size) && (0.0..1.0).contains(&dev_size) && test_size + dev_size < 1.0,
        "test_size ({}) and dev_size ({}) must be fractions summing to less than 1",
        test_size,
        dev_size
    );

    let mut groups: Vec<&str> = dataset
        .records()
        .iter()
        .filter_map(|r| r.group_id.as_deref())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    groups.shuffle(&mut rng);

    let n = groups.len();
    let n_test = ((n as f64 * test_size).ceil() as usize).min(n);
    let n_dev = ((n as f64 * dev_size).ceil() as usize).min(n - n_test);

    #[derive(Clone, Copy)]
    enum Part {
        Train,
        Test,
        Dev,
    }
    let part_of: HashMap<&str, Part> = groups
        .iter()
        .enumerate()
        .map(|(i, g)| {
            let part = if i < n_test {
                Part::Test
            } else if i < n_test + n_dev {
                Part::Dev
            } else {
                Part::Train
            };
            (*g, part)
        })
        .collect();

    let (mut train, mut test, mut dev) = (Vec::new(), Vec::new(), Vec::new());
    for (position, record) in dataset.records().iter().enumerate() {
        let part = record
            .group_id
            .as_deref()
            .and_then(|g| part_of.get(g).copied())
            .unwrap_or(Part::Train);
        match part {
            Part::Train => train.push(position),
            Part::Test => test.push(position),
            Part::Dev => dev.push(position),
        }
    }

    info!(
        "Split {} groups: {} train / {} test / {} dev records",
        n,
        train.len(),
        test.len(),
        dev.len()
    );

    Ok(DatasetSplit {
        train: dataset.subset(&train),
        test: dataset.subset(&test),
        dev: dataset.subset(&dev),
    })
}
