// src/main.rs
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use dedupe_lib::evaluation::{MrrEvaluator, MrrReport};
use dedupe_lib::models::config::{MatcherConfig, PredictOptions, RawMatcherConfig};
use dedupe_lib::models::core::Dataset;
use dedupe_lib::models::matching::PredictionTable;
use dedupe_lib::resolver::{EntityResolver, ExactMatchModel, FlexMatchModel};
use dedupe_lib::utils::data_loader::{load_dataset, save_csv};
use dedupe_lib::utils::data_splitter::split_by_group;
use dedupe_lib::utils::env::{load_env, mrr_workers};
use dedupe_lib::utils::synthetic::{generate_people, SyntheticConfig};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank the matches of one stored record
    Predict {
        #[command(flatten)]
        source: SourceArgs,

        /// Id of the record to look up
        #[arg(long)]
        record_id: String,

        #[arg(long, value_enum, default_value_t = ModelKind::Flex)]
        model: ModelKind,

        /// Number of ranked rows to show
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Drop candidates scoring zero
        #[arg(long)]
        only_matches: bool,

        /// Print only `id` and `score`
        #[arg(long)]
        ids_only: bool,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mean reciprocal rank against the group_id column
    Evaluate {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_enum, default_value_t = ModelKind::Flex)]
        model: ModelKind,

        /// Worker threads (defaults to MRR_WORKERS or the CPU count)
        #[arg(long)]
        workers: Option<usize>,

        /// Hold out this fraction of groups: train on the rest, evaluate on the holdout
        #[arg(long)]
        holdout: Option<f64>,

        /// Seed for the holdout split
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run exact and flex matching side by side
    Compare {
        #[command(flatten)]
        source: SourceArgs,

        /// Record to show predictions for (defaults to the first record)
        #[arg(long)]
        record_id: Option<String>,

        #[arg(long, default_value_t = 5)]
        top: usize,

        #[arg(long)]
        workers: Option<usize>,

        /// Write a JSON report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Write a synthetic person dataset with known duplicates as CSV
    Generate {
        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        #[arg(short = 'n', long)]
        num_records: usize,

        /// Fraction of exact duplicates
        #[arg(short, long, default_value_t = 0.1)]
        duplicate_fraction: f64,

        /// Fraction of close matches (one field perturbed, same group)
        #[arg(short = 'c', long, default_value_t = 0.1)]
        close_match_fraction: f64,

        /// Fraction of close non-matches (one field perturbed, new group)
        #[arg(long, default_value_t = 0.1)]
        close_nonmatch_fraction: f64,

        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Dataset file (.csv, .json or .jsonl) with an `id` column
    #[arg(long)]
    data: PathBuf,

    /// JSON matcher configuration (fields, blocking, ignored_columns)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra columns to ignore, comma separated
    #[arg(long, value_delimiter = ',')]
    ignore: Vec<String>,

    /// Only use the first N records
    #[arg(long)]
    limit: Option<usize>,
}

impl SourceArgs {
    fn load(&self) -> Result<Dataset> {
        let dataset = load_dataset(&self.data)?;
        Ok(match self.limit {
            Some(limit) if limit < dataset.len() => {
                info!("Using the first {} of {} records", limit, dataset.len());
                dataset.subset(&(0..limit).collect::<Vec<_>>())
            }
            _ => dataset,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
enum ModelKind {
    Exact,
    Flex,
}

#[derive(Serialize)]
struct ModelSummary {
    model: ModelKind,
    mrr: Option<MrrReport>,
    predictions: PredictionTable,
}

#[derive(Serialize)]
struct ComparisonReport {
    generated_at: String,
    dataset: String,
    records: usize,
    query_id: String,
    models: Vec<ModelSummary>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger(cli.verbose).init();
    load_env();

    match cli.command {
        Command::Predict {
            source,
            record_id,
            model,
            top,
            only_matches,
            ids_only,
            json,
        } => {
            let dataset = Arc::new(source.load()?);
            let mut resolver = build_model(model, dataset, &source)?;
            let query = resolver.lookup_record(&record_id)?;
            let options = PredictOptions {
                only_matches,
                return_full_record: !ids_only,
            };
            let table = resolver.fit_predict(&query, &options)?.top(top);
            if json {
                println!("{}", serde_json::to_string_pretty(&table)?);
            } else {
                print_table(&table);
            }
        }
        Command::Evaluate {
            source,
            model,
            workers,
            holdout,
            seed,
        } => {
            let dataset = source.load()?;
            let workers = workers.unwrap_or_else(mrr_workers);
            let report = match holdout {
                Some(test_size) => evaluate_holdout(model, dataset, &source, test_size, seed, workers)?,
                None => {
                    let mut resolver = build_model(model, Arc::new(dataset), &source)?;
                    resolver.train()?;
                    evaluate(resolver.as_ref(), workers)?
                }
            };
            println!(
                "MRR ({:?}): {:.4} over {} rows ({} skipped)",
                model, report.mrr, report.evaluated_rows, report.skipped_rows
            );
        }
        Command::Compare {
            source,
            record_id,
            top,
            workers,
            report,
        } => {
            let dataset = Arc::new(source.load()?);
            let workers = workers.unwrap_or_else(mrr_workers);
            let query_id = match record_id {
                Some(id) => id,
                None => dataset
                    .records()
                    .first()
                    .map(|r| r.id.clone())
                    .context("Dataset is empty")?,
            };

            let mut summaries = Vec::new();
            for kind in [ModelKind::Exact, ModelKind::Flex] {
                if kind == ModelKind::Flex && source.config.is_none() {
                    warn!("Skipping flex model: no --config given");
                    continue;
                }
                let started = Instant::now();
                let mut resolver = build_model(kind, Arc::clone(&dataset), &source)?;
                resolver.train()?;
                let query = resolver.lookup_record(&query_id)?;
                let predictions = resolver.predict(&query, &PredictOptions::default())?.top(top);
                let mrr = if dataset.has_group_id() {
                    Some(evaluate(resolver.as_ref(), workers)?)
                } else {
                    None
                };

                println!("== {:?} (query {}) ==", kind, query_id);
                print_table(&predictions);
                if let Some(mrr) = &mrr {
                    println!("MRR: {:.4} over {} rows", mrr.mrr, mrr.evaluated_rows);
                }
                info!("{:?} model finished in {:.2?}", kind, started.elapsed());
                summaries.push(ModelSummary {
                    model: kind,
                    mrr,
                    predictions,
                });
            }

            if let Some(path) = report {
                let report = ComparisonReport {
                    generated_at: Utc::now().to_rfc3339(),
                    dataset: source.data.display().to_string(),
                    records: dataset.len(),
                    query_id,
                    models: summaries,
                };
                let json = serde_json::to_string_pretty(&report)?;
                fs::write(&path, json).with_context(|| format!("Failed to write report to {}", path.display()))?;
                info!("Wrote comparison report to {}", path.display());
            }
        }
        Command::Generate {
            output,
            num_records,
            duplicate_fraction,
            close_match_fraction,
            close_nonmatch_fraction,
            seed,
        } => {
            let config = SyntheticConfig {
                num_records,
                duplicate_fraction,
                close_match_fraction,
                close_nonmatch_fraction,
                seed,
            };
            let generated = generate_people(&config)?;
            save_csv(&generated.dataset, &output)?;
            println!("{}", serde_json::to_string_pretty(&generated.counts)?);
        }
    }

    Ok(())
}

/// `RUST_LOG` filtering, with `--verbose` raising the default level to debug.
fn logger(verbose: bool) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_default_env();
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder
}

fn read_matcher_config(path: &Path) -> Result<RawMatcherConfig> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    RawMatcherConfig::from_json_str(&text).with_context(|| format!("Invalid matcher config {}", path.display()))
}

fn build_model(kind: ModelKind, dataset: Arc<Dataset>, source: &SourceArgs) -> Result<Box<dyn EntityResolver>> {
    let raw = source.config.as_deref().map(read_matcher_config).transpose()?;
    match kind {
        ModelKind::Exact => {
            let mut ignored = source.ignore.clone();
            if let Some(raw) = &raw {
                ignored.extend(raw.ignored_columns.iter().cloned());
            }
            Ok(Box::new(ExactMatchModel::new(dataset, ignored)))
        }
        ModelKind::Flex => Ok(Box::new(build_flex(dataset, raw, &source.ignore)?)),
    }
}

fn build_flex(dataset: Arc<Dataset>, raw: Option<RawMatcherConfig>, ignore: &[String]) -> Result<FlexMatchModel> {
    let Some(mut raw) = raw else {
        bail!("The flex model needs a matcher configuration (--config)");
    };
    raw.ignored_columns.extend(ignore.iter().cloned());
    let config = MatcherConfig::validate(&raw, &dataset)?;
    Ok(FlexMatchModel::new(dataset, config)?)
}

fn evaluate(resolver: &dyn EntityResolver, workers: usize) -> Result<MrrReport> {
    let evaluator = MrrEvaluator::new(resolver)?;
    let report = if workers > 1 {
        evaluator.evaluate_parallel(workers)?
    } else {
        evaluator.evaluate()?
    };
    Ok(report)
}

/// TF-IDF state is fitted on the training groups; MRR runs on the held-out ones.
fn evaluate_holdout(
    kind: ModelKind,
    dataset: Dataset,
    source: &SourceArgs,
    test_size: f64,
    seed: u64,
    workers: usize,
) -> Result<MrrReport> {
    let split = split_by_group(&dataset, test_size, 0.0, seed)?;
    info!(
        "Holdout split: {} training records, {} test records",
        split.train.len(),
        split.test.len()
    );
    let test = Arc::new(split.test);
    match kind {
        ModelKind::Exact => {
            let resolver = build_model(kind, test, source)?;
            evaluate(resolver.as_ref(), workers)
        }
        ModelKind::Flex => {
            let raw = source.config.as_deref().map(read_matcher_config).transpose()?;
            let mut model = build_flex(test, raw, &source.ignore)?;
            model.train_on(&split.train)?;
            evaluate(&model, workers)
        }
    }
}

fn print_table(table: &PredictionTable) {
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        let mut cells = vec![row.id.clone()];
        if let Some(group) = &row.group_id {
            cells.push(group.clone());
        } else if table.columns.iter().any(|c| c == "group_id") {
            cells.push(String::new());
        }
        cells.extend(row.values.iter().cloned());
        cells.push(format!("{:.4}", row.score));
        println!("{}", cells.join("\t"));
    }
}
