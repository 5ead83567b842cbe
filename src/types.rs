//! Core data types for the plan-inference pipeline
//!
//! This module defines the typed records that flow between pipeline stages:
//! cleaned viewing sessions, gap-augmented sessions, per-account heuristic
//! aggregates, clustering features, and the reconciled hybrid output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan label produced by a single labeling strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlanLabel {
    AdSupported,
    AdFree,
}

impl PlanLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanLabel::AdSupported => "ad-supported",
            PlanLabel::AdFree => "ad-free",
        }
    }
}

impl std::fmt::Display for PlanLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled label combining the heuristic and clustering strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HybridLabel {
    #[serde(rename = "very likely ad-supported")]
    VeryLikelyAdSupported,
    #[serde(rename = "very likely ad-free")]
    VeryLikelyAdFree,
    #[serde(rename = "ad-supported")]
    AdSupported,
    #[serde(rename = "ad-free")]
    AdFree,
}

impl HybridLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HybridLabel::VeryLikelyAdSupported => "very likely ad-supported",
            HybridLabel::VeryLikelyAdFree => "very likely ad-free",
            HybridLabel::AdSupported => "ad-supported",
            HybridLabel::AdFree => "ad-free",
        }
    }
}

impl std::fmt::Display for HybridLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned viewing session, one row of the ingested table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Account identifier (the `tv_id` column of the raw export)
    pub account_id: String,
    /// Streaming service name, e.g. "Netflix"
    pub service: String,
    /// Gap-scan grouping key: account, service, season and episode
    pub group_key: String,
    /// Session start time
    pub start_time: DateTime<Utc>,
    /// Session end time
    pub end_time: DateTime<Utc>,
    /// Session duration in minutes
    pub duration_min: f64,
}

/// A session augmented with gap measurements and ad-break flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentedSession {
    /// Source session
    pub session: Session,
    /// Minutes from this session's end to the next session's start within
    /// the same group; `None` for the last session of a group
    pub gap_to_next_min: Option<f64>,
    /// Session is long enough to have carried ad breaks
    pub ad_eligible: bool,
    /// Gap to the next session falls inside the service's ad-break window
    pub gap_flag: bool,
    /// `ad_eligible` and `gap_flag` and a next session exists
    pub gap_flag_eligible: bool,
}

impl AugmentedSession {
    pub fn account_id(&self) -> &str {
        &self.session.account_id
    }

    pub fn service(&self) -> &str {
        &self.session.service
    }
}

/// Per-account heuristic aggregate, one row per (account_id, service)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountAggregate {
    /// Account identifier
    pub account_id: String,
    /// Streaming service name
    pub service: String,
    /// Number of sessions retained for this account
    pub total_sessions: u32,
    /// Number of ad-eligible sessions
    pub eligible_sessions: u32,
    /// Mean session duration in minutes
    pub avg_duration_min: f64,
    /// Number of flagged-eligible gaps
    pub gap_count: u32,
    /// Mean gap length in minutes over flagged-eligible gaps only;
    /// `None` when no gap was flagged
    pub avg_gap_min: Option<f64>,
    /// gap_count / eligible_sessions; `None` when eligible_sessions is zero
    pub gap_ratio: Option<f64>,
    /// Label from the gap-ratio threshold rule
    pub label_by_ratio: PlanLabel,
    /// Label from the gap-count threshold rule
    pub label_by_count: PlanLabel,
}

/// Per-account behavioral feature vector for clustering
///
/// Field order matches [`crate::features::FEATURE_NAMES`]; counts are kept
/// as integers here and widened to `f64` when the matrix is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountFeatures {
    /// Account identifier
    pub account_id: String,
    /// Streaming service name
    pub service: String,
    /// Number of sessions
    pub total_sessions: u32,
    /// Mean session duration in minutes
    pub avg_session_duration: f64,
    /// Sample standard deviation of session duration; 0.0 for a single session
    pub std_session_duration: f64,
    /// Fraction of sessions whose gap was flagged
    pub gap_session_ratio: f64,
    /// Fraction of sessions that were flagged and eligible
    pub gap_eligible_ratio: f64,
    /// Mean gap length in minutes over all defined gaps; 0.0 when no gaps
    pub avg_gap_length: f64,
    /// Number of sessions with a flagged gap
    pub sessions_with_gap: u32,
    /// Number of sessions with a flagged-eligible gap
    pub sessions_with_gap_eligible: u32,
}

/// Cluster-separation score for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    /// Feature name
    pub feature: String,
    /// Variance of per-cluster means divided by overall variance,
    /// computed on standardized values
    pub score: f64,
}

/// Output of the clustering stage
///
/// All vectors are parallel to `features`, which is sorted by
/// (account_id, service) so repeated runs assign clusters in the same order.
#[derive(Debug, Clone)]
pub struct ClusteringOutput {
    /// Per-account feature vectors, sorted by (account_id, service)
    pub features: Vec<AccountFeatures>,
    /// Cluster id per account, 0 or 1
    pub assignments: Vec<usize>,
    /// Number of accounts per cluster id
    pub cluster_sizes: [usize; 2],
    /// PCA 2-D coordinates per account
    pub pca: Vec<(f64, f64)>,
    /// t-SNE 2-D coordinates per account
    pub tsne: Vec<(f64, f64)>,
    /// Per-feature cluster-separation scores, sorted descending
    pub importance: Vec<FeatureImportance>,
}

/// One fully labeled account, the unit row of the pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridAccount {
    /// Account identifier
    pub account_id: String,
    /// Streaming service name
    pub service: String,
    /// Number of sessions retained for this account
    pub total_sessions: u32,
    /// Number of ad-eligible sessions
    pub eligible_sessions: u32,
    /// Mean session duration in minutes
    pub avg_duration_min: f64,
    /// Number of flagged-eligible gaps
    pub gap_count: u32,
    /// Mean flagged-eligible gap length in minutes
    pub avg_gap_min: Option<f64>,
    /// gap_count / eligible_sessions
    pub gap_ratio: Option<f64>,
    /// Heuristic label from the gap-ratio rule
    pub label_by_ratio: PlanLabel,
    /// Heuristic label from the gap-count rule
    pub label_by_count: PlanLabel,
    /// Raw cluster id assigned by k-means
    pub cluster: usize,
    /// Plan label carried by that cluster
    pub cluster_label: PlanLabel,
    /// Reconciled label
    pub hybrid_label: HybridLabel,
}

/// Counts by service for one labeling strategy, pivoted label-per-column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossTab {
    /// Human-readable name of the labeling strategy
    pub title: String,
    /// Row labels, sorted service names
    pub services: Vec<String>,
    /// Column labels in display order
    pub columns: Vec<String>,
    /// counts[service_index][column_index], zero-filled
    pub counts: Vec<Vec<u32>>,
}

/// Raw-scale cluster means for one feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureClusterMeans {
    /// Feature name
    pub feature: String,
    /// Mean over accounts in cluster 0
    pub cluster0_mean: f64,
    /// Mean over accounts in cluster 1
    pub cluster1_mean: f64,
}

/// Everything the one-page report and the run-metadata sidecar need
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportArtifacts {
    /// Unique id for this pipeline run
    pub run_id: String,
    /// Library version that produced the run
    pub pipeline_version: String,
    /// When the artifacts were assembled
    pub generated_at: DateTime<Utc>,
    /// Seed used for k-means and t-SNE
    pub seed: u64,
    /// Sessions remaining after ingest filtering
    pub sessions_ingested: usize,
    /// Sessions remaining after negative-gap drops
    pub sessions_augmented: usize,
    /// Accounts carried into the hybrid output
    pub accounts_joined: usize,
    /// Heuristic-side accounts lost in the join
    pub dropped_heuristic_only: usize,
    /// Cluster-side accounts lost in the join
    pub dropped_cluster_only: usize,
    /// Cluster id mapped to the ad-supported plan
    pub ad_supported_cluster: usize,
    /// Accounts per cluster id
    pub cluster_sizes: [usize; 2],
    /// Per-feature cluster-separation scores, sorted descending
    pub importance: Vec<FeatureImportance>,
    /// Raw-scale per-feature cluster means
    pub cluster_means: Vec<FeatureClusterMeans>,
    /// Service-by-label count tables: heuristic, cluster, hybrid
    pub cross_tabs: Vec<CrossTab>,
}
