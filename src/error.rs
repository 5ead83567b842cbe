//! Error types for the plan-inference pipeline

use thiserror::Error;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No sessions survived input filtering: {0}")]
    NoSessions(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Degenerate clustering: {0}")]
    DegenerateClustering(String),

    #[error("K-means fitting failed: {0}")]
    KMeans(#[from] linfa_clustering::KMeansError),

    #[error("PCA projection failed: {0}")]
    Reduction(#[from] linfa_reduction::ReductionError),

    #[error("t-SNE embedding failed: {0}")]
    Embedding(#[from] linfa_tsne::TSneError),

    #[error("Report rendering failed: {0}")]
    Render(String),
}
