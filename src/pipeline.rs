//! Pipeline orchestration
//!
//! This module provides the public API for a full plan-inference run.
//! It composes the stages from raw session CSV to labeled accounts:
//! ingest, heuristic gap labeling, behavioral clustering, cluster
//! semantic labeling, hybrid reconciliation, then exports and report.

use std::fs;
use std::path::PathBuf;

use log::info;
use uuid::Uuid;

use crate::clustering::perform_clustering;
use crate::config::RunConfig;
use crate::error::PipelineError;
use crate::export;
use crate::heuristic::compute_heuristics;
use crate::hybrid;
use crate::ingest::load_sessions;
use crate::report::render_report;
use crate::summary::{self, RunInfo};
use crate::types::{HybridAccount, ReportArtifacts};

/// Everything a completed run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    /// Labeled accounts, one row per (account_id, service)
    pub accounts: Vec<HybridAccount>,
    /// Summaries and run metadata
    pub artifacts: ReportArtifacts,
    /// Path of the labeled-accounts CSV
    pub labeled_csv: PathBuf,
    /// Path of the augmented-sessions CSV
    pub augmented_csv: PathBuf,
    /// Path of the run-metadata JSON
    pub metadata: PathBuf,
    /// Path of the one-page SVG report
    pub report: PathBuf,
}

/// Run the full pipeline for one input file.
///
/// Pipeline stages:
/// 1. Ingest - read and filter the raw session CSV
/// 2. Heuristic - gap scan, ad-break flags, per-account rule labels
/// 3. Clustering - feature aggregation, k-means, 2-D projections
/// 4. Cluster labeling - map cluster ids to plan labels by gap behavior
/// 5. Reconciliation - join both labelings into the hybrid label
/// 6. Outputs - summaries, CSV exports, run metadata, SVG report
///
/// The augmented-sessions CSV is written as soon as the gap scan
/// finishes; the labeled CSV, metadata and report are only written
/// after every compute stage has succeeded.
pub fn run(config: &RunConfig) -> Result<RunOutcome, PipelineError> {
    fs::create_dir_all(&config.out_dir)?;

    // Stage 1: ingest and filter the raw session export
    let sessions = load_sessions(&config.input_path, &config.rules)?;
    let sessions_ingested = sessions.len();

    // Stage 2: gap scan and heuristic labels
    let (aggregates, augmented) = compute_heuristics(sessions, &config.rules);
    let augmented_csv = config.augmented_csv_path();
    export::write_augmented_sessions(&augmented_csv, &augmented)?;

    // Stage 3: behavioral clustering
    let clustering = perform_clustering(&augmented, config.seed)?;

    // Stage 4: map cluster ids to plan labels
    let ad_cluster = hybrid::ad_supported_cluster(&clustering);
    let cluster_labels = hybrid::cluster_plan_labels(&clustering, ad_cluster);

    // Stage 5: reconcile both labelings per account
    let (accounts, stats) = hybrid::combine_labels(&aggregates, &clustering, &cluster_labels);

    // Stage 6: summaries, exports, report
    let info = RunInfo {
        run_id: Uuid::new_v4().to_string(),
        seed: config.seed,
        sessions_ingested,
        sessions_augmented: augmented.len(),
    };
    let artifacts =
        summary::build_artifacts(info, &clustering, ad_cluster, &aggregates, &accounts, stats);

    let labeled_csv = config.labeled_csv_path();
    export::write_labeled_accounts(&labeled_csv, &accounts)?;
    let metadata = config.metadata_path();
    export::write_run_metadata(&metadata, &artifacts)?;
    let report = config.report_path(artifacts.generated_at);
    render_report(&report, &clustering, &artifacts)?;

    info!(
        "run {} labeled {} accounts; ad-supported cluster {} with {} members",
        artifacts.run_id,
        accounts.len(),
        ad_cluster,
        artifacts.cluster_sizes[ad_cluster],
    );

    Ok(RunOutcome {
        accounts,
        artifacts,
        labeled_csv,
        augmented_csv,
        metadata,
        report,
    })
}
