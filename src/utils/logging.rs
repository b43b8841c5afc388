// src/utils/logging.rs - Logging helpers for the resolvers and the evaluator
use log::{debug, info, warn};
use std::time::Instant;

use crate::models::config::BlockingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverKind {
    Exact,
    Flex,
}

#[derive(Debug, Clone)]
pub struct MatchingLogger {
    method_name: &'static str,
    method_emoji: &'static str,
    start_time: Instant,
}

impl MatchingLogger {
    pub fn new(kind: ResolverKind) -> Self {
        let (method_name, method_emoji) = match kind {
            ResolverKind::Exact => ("EXACT", "🟰"),
            ResolverKind::Flex => ("FLEX", "🔀"),
        };

        Self {
            method_name,
            method_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, record_count: usize, field_count: usize) {
        info!(
            "[{}] {} 🚀 Starting {} matcher over {} records ({} compared fields)",
            self.method_name,
            self.method_emoji,
            self.method_name.to_lowercase(),
            record_count,
            field_count
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.method_name, self.method_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.method_name, self.method_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_blocking(&self, blocking: &BlockingConfig) {
        if blocking.field.is_empty() {
            info!(
                "[{}] {} 🧱 Blocking: {} (every record is a candidate)",
                self.method_name, self.method_emoji, blocking.method
            );
        } else {
            info!(
                "[{}] {} 🧱 Blocking: {} on '{}' (threshold {})",
                self.method_name, self.method_emoji, blocking.method, blocking.field, blocking.threshold
            );
        }
    }

    pub fn log_evaluation_summary(&self, mrr: f64, evaluated_rows: usize, skipped_rows: usize) {
        let duration = self.start_time.elapsed();
        info!(
            "[{}] {} 🎉 COMPLETED: MRR {:.4} over {} rows in {:.2?}",
            self.method_name, self.method_emoji, mrr, evaluated_rows, duration
        );
        if skipped_rows > 0 {
            info!(
                "[{}] {} ⏭️  Skipped {} rows without ground-truth matches",
                self.method_name, self.method_emoji, skipped_rows
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.method_name, self.method_emoji, message);
    }

    pub fn log_debug(&self, message: &str) {
        debug!("[{}] {} 🔍 {}", self.method_name, self.method_emoji, message);
    }
}
