// src/utils/synthetic.rs
//
// Seeded generator of synthetic person records with known duplicates, for
// benchmarking the matchers. Every record carries a `group_id`: exact
// duplicates and close matches share the group of the record they copy,
// close non-matches get a group of their own.

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashSet;

use crate::models::core::{Dataset, FieldValues, Record};

pub const SYNTHETIC_COLUMNS: [&str; 5] = ["first_name", "last_name", "birthdate", "address", "phone_number"];

const FIRST_NAMES: [&str; 32] = [
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda",
    "David", "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica",
    "Thomas", "Sarah", "Carlos", "Karen", "Daniel", "Lisa", "Matthew", "Nancy",
    "Anthony", "Sandra", "Mark", "Ashley", "Steven", "Emily", "Andrew", "Maria",
];

const LAST_NAMES: [&str; 32] = [
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
    "Rodriguez", "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas",
    "Taylor", "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White",
    "Harris", "Sanchez", "Clark", "Ramirez", "Lewis", "Robinson", "Walker", "Young",
];

const STREETS: [&str; 16] = [
    "Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake",
    "Hill", "Park", "Sunset", "Lincoln", "Jackson", "River", "Church", "Highland",
];

const STREET_SUFFIXES: [&str; 6] = ["St", "Ave", "Rd", "Blvd", "Ln", "Dr"];

const CITIES: [(&str, &str); 12] = [
    ("Springfield", "IL"), ("Portland", "OR"), ("Austin", "TX"), ("Madison", "WI"),
    ("Denver", "CO"), ("Columbus", "OH"), ("Raleigh", "NC"), ("Tucson", "AZ"),
    ("Boise", "ID"), ("Albany", "NY"), ("Richmond", "VA"), ("Savannah", "GA"),
];

/// Birth years for ages 18 to 100 relative to 2024, fixed so output only depends on the seed.
const BIRTH_YEARS: std::ops::RangeInclusive<i32> = 1924..=2006;

type Person = [String; 5];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticConfig {
    pub num_records: usize,
    pub duplicate_fraction: f64,
    pub close_match_fraction: f64,
    pub close_nonmatch_fraction: f64,
    pub seed: u64,
}

impl SyntheticConfig {
    pub fn new(num_records: usize) -> Self {
        Self {
            num_records,
            duplicate_fraction: 0.1,
            close_match_fraction: 0.1,
            close_nonmatch_fraction: 0.1,
            seed: 0,
        }
    }

    /// Each copy category gets `floor(num_records * fraction)` records and
    /// the remainder are unique, so the total is exactly `num_records`.
    pub fn counts(&self) -> Result<SyntheticCounts> {
        let fractions = [
            self.duplicate_fraction,
            self.close_match_fraction,
            self.close_nonmatch_fraction,
        ];
        ensure!(
            fractions.iter().all(|f| (0.0..=1.0).contains(f)),
            "Fractions must lie in [0, 1], got {:?}",
            fractions
        );
        ensure!(
            fractions.iter().sum::<f64>() <= 1.0,
            "duplicate, close match and close non-match fractions must not sum above 1"
        );

        let of = |fraction: f64| (self.num_records as f64 * fraction).floor() as usize;
        let duplicates = of(self.duplicate_fraction);
        let close_matches = of(self.close_match_fraction);
        let close_nonmatches = of(self.close_nonmatch_fraction);
        let copies = duplicates + close_matches + close_nonmatches;
        let unique = self.num_records.saturating_sub(copies);
        ensure!(
            unique > 0 || copies == 0,
            "At least one unique record is needed to derive {} copies",
            copies
        );

        Ok(SyntheticCounts {
            unique,
            duplicates,
            close_matches,
            close_nonmatches,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyntheticCounts {
    pub unique: usize,
    pub duplicates: usize,
    pub close_matches: usize,
    pub close_nonmatches: usize,
}

impl SyntheticCounts {
    pub fn total(&self) -> usize {
        self.unique + self.duplicates + self.close_matches + self.close_nonmatches
    }
}

#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub dataset: Dataset,
    pub counts: SyntheticCounts,
}

pub fn generate_people(config: &SyntheticConfig) -> Result<SyntheticDataset> {
    let counts = config.counts()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut seen: HashSet<Person> = HashSet::with_capacity(counts.total());

    let mut uniques: Vec<Person> = Vec::with_capacity(counts.unique);
    let mut attempts = 0;
    while uniques.len() < counts.unique {
        attempts += 1;
        ensure!(
            attempts <= attempt_limit(counts.unique),
            "Could not draw {} distinct people",
            counts.unique
        );
        let person = random_person(&mut rng);
        if seen.insert(person.clone()) {
            uniques.push(person);
        }
    }

    let mut rows: Vec<(Person, usize)> = uniques.iter().cloned().zip(0..).collect();

    for _ in 0..counts.duplicates {
        let group = rng.gen_range(0..uniques.len());
        rows.push((uniques[group].clone(), group));
    }

    for _ in 0..counts.close_matches {
        let group = rng.gen_range(0..uniques.len());
        let person = perturb(&uniques[group], &mut rng);
        seen.insert(person.clone());
        rows.push((person, group));
    }

    // Close non-matches look like a known person but are labelled as a new entity,
    // so they must not collide with anything generated so far.
    let mut next_group = uniques.len();
    attempts = 0;
    while next_group - uniques.len() < counts.close_nonmatches {
        attempts += 1;
        ensure!(
            attempts <= attempt_limit(counts.close_nonmatches),
            "Could not derive {} distinct close non-matches",
            counts.close_nonmatches
        );
        let source = rng.gen_range(0..uniques.len());
        let person = perturb(&uniques[source], &mut rng);
        if seen.insert(person.clone()) {
            rows.push((person, next_group));
            next_group += 1;
        }
    }

    rows.shuffle(&mut rng);

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, (person, group))| {
            let values: FieldValues = SYNTHETIC_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .zip(person)
                .collect();
            Record::new((i + 1).to_string(), values).with_group(format!("g{}", group))
        })
        .collect();
    let columns = SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    let dataset = Dataset::new(columns, records, true)?;

    info!(
        "Generated {} synthetic records: {} unique, {} duplicates, {} close matches, {} close non-matches",
        dataset.len(),
        counts.unique,
        counts.duplicates,
        counts.close_matches,
        counts.close_nonmatches
    );
    Ok(SyntheticDataset { dataset, counts })
}

fn attempt_limit(wanted: usize) -> usize {
    wanted.saturating_mul(100).max(1000)
}

fn random_person(rng: &mut StdRng) -> Person {
    let (city, state) = pick(rng, &CITIES);
    [
        pick(rng, &FIRST_NAMES).to_string(),
        pick(rng, &LAST_NAMES).to_string(),
        random_birthdate(rng),
        format!(
            "{} {} {}, {}, {} {:05}",
            rng.gen_range(1..10_000),
            pick(rng, &STREETS),
            pick(rng, &STREET_SUFFIXES),
            city,
            state,
            rng.gen_range(10_000..100_000)
        ),
        format!(
            "({}) {}-{:04}",
            rng.gen_range(200..1000),
            rng.gen_range(200..1000),
            rng.gen_range(0..10_000)
        ),
    ]
}

fn pick<T: Copy>(rng: &mut StdRng, values: &[T]) -> T {
    values[rng.gen_range(0..values.len())]
}

fn random_birthdate(rng: &mut StdRng) -> String {
    let year = rng.gen_range(BIRTH_YEARS);
    let ordinal = rng.gen_range(1..=365);
    NaiveDate::from_yo_opt(year, ordinal)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| format!("{}-01-01", year))
}

/// Changes exactly one field: trims a name, redraws the birthdate, swaps the
/// address commas for semicolons or drops the last phone digit.
fn perturb(person: &Person, rng: &mut StdRng) -> Person {
    let mut perturbed = person.clone();
    let field = rng.gen_range(0..perturbed.len());
    let value = &person[field];
    perturbed[field] = match field {
        0 | 1 if rng.gen_bool(0.5) => value.chars().skip(1).collect(),
        0 | 1 => drop_last_char(value),
        2 => random_birthdate(rng),
        3 => value.replace(',', ";"),
        _ => drop_last_char(value),
    };
    perturbed
}

fn drop_last_char(value: &str) -> String {
    let mut chars = value.chars();
    chars.next_back();
    chars.as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(num_records: usize, seed: u64) -> SyntheticConfig {
        SyntheticConfig {
            seed,
            ..SyntheticConfig::new(num_records)
        }
    }

    fn values_of(record: &Record) -> Vec<&str> {
        record.values.iter().map(|(_, v)| v).collect()
    }

    fn members(dataset: &Dataset) -> HashMap<&str, Vec<&Record>> {
        let mut groups: HashMap<&str, Vec<&Record>> = HashMap::new();
        for record in dataset.records() {
            if let Some(group) = record.group_id.as_deref() {
                groups.entry(group).or_default().push(record);
            }
        }
        groups
    }

    #[test]
    fn test_counts_follow_fractions() {
        let generated = generate_people(&config(200, 7)).unwrap();
        assert_eq!(
            generated.counts,
            SyntheticCounts {
                unique: 140,
                duplicates: 20,
                close_matches: 20,
                close_nonmatches: 20,
            }
        );
        assert_eq!(generated.dataset.len(), 200);
        assert!(generated.dataset.has_group_id());
        assert_eq!(generated.dataset.columns(), &SYNTHETIC_COLUMNS.map(String::from));
    }

    #[test]
    fn test_group_structure_matches_ratios() {
        let generated = generate_people(&config(200, 7)).unwrap();
        let counts = generated.counts;
        let groups = members(&generated.dataset);

        assert_eq!(groups.len(), counts.unique + counts.close_nonmatches);
        let copies: usize = groups.values().map(|m| m.len() - 1).sum();
        assert_eq!(copies, counts.duplicates + counts.close_matches);

        // every duplicate repeats a tuple already in its group; a close match usually does not
        let exact_repeats: usize = groups
            .values()
            .map(|m| m.len() - m.iter().map(|r| values_of(r)).collect::<HashSet<_>>().len())
            .sum();
        assert!(exact_repeats >= counts.duplicates);
        assert!(exact_repeats <= counts.duplicates + counts.close_matches);

        // members are at most one perturbation away from the shared original
        for group in groups.values() {
            for a in group {
                for b in group {
                    let differing = values_of(a)
                        .iter()
                        .zip(values_of(b))
                        .filter(|(x, y)| *x != y)
                        .count();
                    assert!(differing <= 2);
                }
            }
        }
    }

    #[test]
    fn test_identical_records_never_span_groups() {
        let generated = generate_people(&config(300, 11)).unwrap();
        let mut group_of: HashMap<Vec<&str>, &str> = HashMap::new();
        for record in generated.dataset.records() {
            let group = record.group_id.as_deref().unwrap();
            let previous = group_of.entry(values_of(record)).or_insert(group);
            assert_eq!(*previous, group);
        }
    }

    #[test]
    fn test_perturb_changes_one_field() {
        let mut rng = StdRng::seed_from_u64(3);
        let person = random_person(&mut rng);
        for _ in 0..200 {
            let perturbed = perturb(&person, &mut rng);
            let differing: Vec<usize> = (0..person.len()).filter(|&i| person[i] != perturbed[i]).collect();
            assert!(differing.len() <= 1);
            if let Some(&field) = differing.first() {
                match field {
                    0 | 1 | 4 => assert_eq!(perturbed[field].chars().count() + 1, person[field].chars().count()),
                    3 => assert_eq!(perturbed[field], person[field].replace(',', ";")),
                    _ => assert_eq!(perturbed[field].len(), 10),
                }
            }
        }
    }

    #[test]
    fn test_same_seed_same_records() {
        let a = generate_people(&config(50, 42)).unwrap();
        let b = generate_people(&config(50, 42)).unwrap();
        let c = generate_people(&config(50, 43)).unwrap();
        assert_eq!(a.dataset.records(), b.dataset.records());
        assert_ne!(a.dataset.records(), c.dataset.records());
    }

    #[test]
    fn test_invalid_fractions_rejected() {
        let too_many = SyntheticConfig {
            duplicate_fraction: 0.5,
            close_match_fraction: 0.4,
            close_nonmatch_fraction: 0.2,
            ..SyntheticConfig::new(100)
        };
        assert!(generate_people(&too_many).is_err());

        let negative = SyntheticConfig {
            duplicate_fraction: -0.1,
            ..SyntheticConfig::new(100)
        };
        assert!(negative.counts().is_err());

        let no_originals = SyntheticConfig {
            duplicate_fraction: 1.0,
            close_match_fraction: 0.0,
            close_nonmatch_fraction: 0.0,
            ..SyntheticConfig::new(10)
        };
        assert!(no_originals.counts().is_err());
    }

    #[test]
    fn test_empty_request() {
        let generated = generate_people(&config(0, 1)).unwrap();
        assert!(generated.dataset.is_empty());
        assert_eq!(generated.counts.total(), 0);
    }
}
