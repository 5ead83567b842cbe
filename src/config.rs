//! Run configuration
//!
//! Input and output locations plus the clustering seed. Output file names
//! are fixed apart from the timestamp in the report name, so downstream
//! tooling can glob for them.

use crate::rules::AdBreakRules;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Seed used for k-means and t-SNE when none is given
pub const DEFAULT_SEED: u64 = 42;

const LABELED_CSV_NAME: &str = "labeled_accounts.csv";
const AUGMENTED_CSV_NAME: &str = "augmented_sessions.csv";
const METADATA_NAME: &str = "run_metadata.json";

/// Everything a pipeline run needs besides the data itself
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Raw session CSV to ingest
    pub input_path: PathBuf,
    /// Directory receiving all outputs; created if absent
    pub out_dir: PathBuf,
    /// Seed for k-means and t-SNE
    pub seed: u64,
    /// Service ad-break windows
    pub rules: AdBreakRules,
}

impl RunConfig {
    pub fn new(input_path: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Self {
        Self {
            input_path: input_path.as_ref().to_path_buf(),
            out_dir: out_dir.as_ref().to_path_buf(),
            seed: DEFAULT_SEED,
            rules: AdBreakRules::default(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Path of the labeled-accounts CSV.
    pub fn labeled_csv_path(&self) -> PathBuf {
        self.out_dir.join(LABELED_CSV_NAME)
    }

    /// Path of the gap-augmented sessions CSV.
    pub fn augmented_csv_path(&self) -> PathBuf {
        self.out_dir.join(AUGMENTED_CSV_NAME)
    }

    /// Path of the run-metadata JSON sidecar.
    pub fn metadata_path(&self) -> PathBuf {
        self.out_dir.join(METADATA_NAME)
    }

    /// Path of the one-page report, timestamped so runs never overwrite
    /// each other.
    pub fn report_path(&self, at: DateTime<Utc>) -> PathBuf {
        let stamp = at.format("%Y-%m-%d_%H-%M-%S");
        self.out_dir.join(format!("ad_plan_report_{stamp}.svg"))
    }
}
