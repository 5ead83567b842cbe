//! Behavioral clustering
//!
//! Groups accounts into two behavioral clusters from the standardized
//! 8-dimensional feature matrix:
//! - seeded k-means (k = 2), every account assigned to exactly one cluster
//! - PCA and t-SNE 2-D projections for the report scatter plots
//! - per-feature cluster-separation scores on the standardized matrix
//!
//! Cluster ids carry no plan meaning here; [`crate::hybrid`] maps them to
//! labels afterwards.

use crate::error::PipelineError;
use crate::features::{self, FEATURE_NAMES};
use crate::normalizer::Standardizer;
use crate::types::{AccountFeatures, AugmentedSession, ClusteringOutput, FeatureImportance};
use linfa::traits::{Fit, Predict, Transformer};
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_reduction::Pca;
use linfa_tsne::TSneParams;
use log::info;
use ndarray::{aview1, Array1, Array2};
use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

/// The pipeline separates exactly two plan tiers
pub const NUM_CLUSTERS: usize = 2;

/// Below this many accounts a 2-D embedding has no degrees of freedom
pub const MIN_ACCOUNTS: usize = 4;

/// Upper bound for the t-SNE perplexity; small runs adapt downward
const MAX_PERPLEXITY: f64 = 30.0;

/// Barnes-Hut accuracy/speed trade-off for t-SNE
const TSNE_APPROX_THRESHOLD: f64 = 0.5;

const KMEANS_MAX_ITERATIONS: u64 = 300;

/// Aggregate augmented sessions per account and cluster the accounts.
pub fn perform_clustering(
    augmented: &[AugmentedSession],
    seed: u64,
) -> Result<ClusteringOutput, PipelineError> {
    cluster_features(features::aggregate_accounts(augmented), seed)
}

/// Cluster pre-aggregated account features.
///
/// Features are sorted by (account_id, service) before fitting so repeated
/// runs see the same row order and produce the same assignment vector.
pub fn cluster_features(
    mut features: Vec<AccountFeatures>,
    seed: u64,
) -> Result<ClusteringOutput, PipelineError> {
    features.sort_by(|a, b| {
        (&a.account_id, &a.service).cmp(&(&b.account_id, &b.service))
    });

    let n = features.len();
    if n < MIN_ACCOUNTS {
        return Err(PipelineError::DegenerateClustering(format!(
            "{n} accounts, need at least {MIN_ACCOUNTS}"
        )));
    }

    let mut matrix = Array2::zeros((n, FEATURE_NAMES.len()));
    for (i, account) in features.iter().enumerate() {
        matrix.row_mut(i).assign(&aview1(&features::to_vector(account)));
    }
    let (_, standardized) = Standardizer::fit_transform(&matrix);

    let rng = Xoshiro256Plus::seed_from_u64(seed);
    let dataset = DatasetBase::from(standardized.clone());

    let model = KMeans::params_with_rng(NUM_CLUSTERS, rng.clone())
        .max_n_iterations(KMEANS_MAX_ITERATIONS)
        .fit(&dataset)?;
    let assignments: Array1<usize> = model.predict(&standardized);

    let mut cluster_sizes = [0usize; NUM_CLUSTERS];
    for &cluster in assignments.iter() {
        cluster_sizes[cluster] += 1;
    }
    if cluster_sizes.iter().any(|&size| size == 0) {
        return Err(PipelineError::DegenerateClustering(
            "k-means produced an empty cluster".to_string(),
        ));
    }

    let pca_model = Pca::params(2).fit(&dataset)?;
    let pca_coords: Array2<f64> = pca_model.predict(&standardized);

    let tsne_coords = TSneParams::embedding_size_with_rng(2, rng)
        .perplexity(adaptive_perplexity(n))
        .approx_threshold(TSNE_APPROX_THRESHOLD)
        .transform(standardized.clone())?;

    let importance = compute_importance(&standardized, &assignments);

    info!(
        "clustered {n} accounts into {}/{} split",
        cluster_sizes[0], cluster_sizes[1]
    );

    Ok(ClusteringOutput {
        features,
        assignments: assignments.to_vec(),
        cluster_sizes,
        pca: to_pairs(&pca_coords),
        tsne: to_pairs(&tsne_coords),
        importance,
    })
}

/// Perplexity capped so 3 * perplexity never exceeds n - 1.
fn adaptive_perplexity(n: usize) -> f64 {
    (((n - 1) / 3) as f64).min(MAX_PERPLEXITY)
}

/// Score each feature by how far apart the cluster means sit relative to
/// the feature's overall spread: var(cluster means) / var(feature), both
/// sample variances over standardized values. Zero-spread features score 0.
fn compute_importance(
    standardized: &Array2<f64>,
    assignments: &Array1<usize>,
) -> Vec<FeatureImportance> {
    let mut scores = Vec::with_capacity(FEATURE_NAMES.len());
    for (j, name) in FEATURE_NAMES.iter().enumerate() {
        let column: Vec<f64> = standardized.column(j).to_vec();
        let overall = sample_variance(&column);

        let mut sums = [0.0f64; NUM_CLUSTERS];
        let mut counts = [0usize; NUM_CLUSTERS];
        for (value, &cluster) in column.iter().zip(assignments.iter()) {
            sums[cluster] += value;
            counts[cluster] += 1;
        }
        let cluster_means = [
            sums[0] / counts[0] as f64,
            sums[1] / counts[1] as f64,
        ];
        let between = sample_variance(&cluster_means);

        let score = if overall > 0.0 { between / overall } else { 0.0 };
        scores.push(FeatureImportance {
            feature: name.to_string(),
            score,
        });
    }
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores
}

fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

fn to_pairs(coords: &Array2<f64>) -> Vec<(f64, f64)> {
    coords
        .outer_iter()
        .map(|row| (row[0], row[1]))
        .collect()
}
