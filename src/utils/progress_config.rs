// src/utils/progress_config.rs

use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::time::Duration;

/// Configuration for progress tracking during evaluation
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Whether to show progress bars at all
    pub enabled: bool,
    /// Refresh rate for progress bars in milliseconds
    pub refresh_rate_ms: u64,
    /// Rows between progress log lines when bars are disabled (0 turns them off)
    pub log_every: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_rate_ms: 100,
            log_every: 1000,
        }
    }
}

impl ProgressConfig {
    /// Create progress configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            enabled: env::var("PROGRESS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            refresh_rate_ms: env::var("PROGRESS_REFRESH_RATE_MS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .unwrap_or(100),
            log_every: env::var("PROGRESS_LOG_EVERY")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
        }
    }

    /// A styled bar of `len` steps, or a hidden one when progress is disabled.
    pub fn create_progress_bar(&self, len: u64, label: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len);
        let template = format!("  📊 [{{elapsed_precise}}] {{bar:30.green/blue}} {{pos}}/{{len}} {}", label);
        let style = ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(self.refresh_rate_ms.max(1)));
        bar
    }

    /// True when a plain log line should mark `done` processed rows.
    pub fn should_log_row(&self, done: usize) -> bool {
        !self.enabled && self.log_every > 0 && done > 0 && done % self.log_every == 0
    }
}
