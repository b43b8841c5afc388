// src/utils/env.rs
use log::{info, warn};
use std::env;
use std::path::Path;

const ENV_PATHS: [&str; 3] = [".env", ".env.local", "../.env"];

/// Loads the first `.env` file found. Variables already set in the process
/// environment win over the file.
pub fn load_env() {
    for path in ENV_PATHS.iter() {
        if Path::new(path).exists() {
            match dotenv::from_path(path) {
                Ok(()) => {
                    info!("Loaded environment variables from {}", path);
                    return;
                }
                Err(e) => warn!("Failed to load environment from {}: {}", path, e),
            }
        }
    }
    info!("No .env file found, using environment variables from system");
}

/// Worker threads for parallel MRR: `MRR_WORKERS`, else the number of CPUs.
pub fn mrr_workers() -> usize {
    env::var("MRR_WORKERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(num_cpus::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mrr_workers_from_env() {
        env::set_var("MRR_WORKERS", "3");
        assert_eq!(mrr_workers(), 3);

        env::set_var("MRR_WORKERS", "0");
        assert_eq!(mrr_workers(), num_cpus::get());

        env::remove_var("MRR_WORKERS");
        assert!(mrr_workers() >= 1);
    }
}
