//! Planscope - Ad-plan inference for streaming viewing logs
//!
//! Planscope classifies viewer accounts as ad-supported or ad-free through a
//! deterministic batch pipeline: session ingest → heuristic gap labeling →
//! behavioral clustering → hybrid reconciliation → report.
//!
//! ## Modules
//!
//! - **Heuristic Labeler**: scan per-group session gaps against each
//!   service's ad-break window and derive rule-based account labels
//! - **Behavioral Clusterer**: aggregate per-account features, cluster with
//!   seeded k-means, project with PCA and t-SNE
//! - **Hybrid Reconciler**: join both labelings into one account label

pub mod clustering;
pub mod config;
pub mod error;
pub mod export;
pub mod features;
pub mod heuristic;
pub mod hybrid;
pub mod ingest;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod summary;
pub mod types;

pub use config::{RunConfig, DEFAULT_SEED};
pub use error::PipelineError;
pub use pipeline::{run, RunOutcome};
pub use rules::{AdBreakRules, GapWindow};
pub use types::{HybridLabel, PlanLabel};

/// Planscope version stamped into run metadata and the report footer
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");
