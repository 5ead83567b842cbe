//! Run summaries
//!
//! Pure builders for the tables the report renders and the metadata sidecar
//! records: service-by-label cross-tabs for each labeling strategy, raw
//! per-feature cluster means, and the assembled [`ReportArtifacts`] bundle.
//! The heuristic and cluster tabs count each strategy's full table, so an
//! account lost in the hybrid join still shows up in its own strategy's
//! tab; only the hybrid tab is limited to joined rows. Nothing here touches
//! the filesystem.

use crate::features::{self, FEATURE_NAMES};
use crate::hybrid::{cluster_plan_labels, JoinStats};
use crate::types::{
    AccountAggregate, ClusteringOutput, CrossTab, FeatureClusterMeans, HybridAccount,
    ReportArtifacts,
};
use chrono::Utc;
use std::collections::BTreeMap;

/// Column order for the two-valued strategies, matching label sort order
const PLAN_COLUMNS: [&str; 2] = ["ad-free", "ad-supported"];

/// Column order for the hybrid strategy
const HYBRID_COLUMNS: [&str; 4] = [
    "ad-free",
    "ad-supported",
    "very likely ad-free",
    "very likely ad-supported",
];

/// Counts by (service, heuristic ratio label) over all heuristic aggregates.
pub fn heuristic_cross_tab(aggregates: &[AccountAggregate]) -> CrossTab {
    build_tab(
        "Heuristic label by service",
        &PLAN_COLUMNS,
        aggregates
            .iter()
            .map(|agg| (agg.service.as_str(), agg.label_by_ratio.as_str())),
    )
}

/// Counts by (service, cluster label) over all clustered accounts.
pub fn cluster_cross_tab(output: &ClusteringOutput, ad_cluster: usize) -> CrossTab {
    let labels = cluster_plan_labels(output, ad_cluster);
    build_tab(
        "Cluster label by service",
        &PLAN_COLUMNS,
        output
            .features
            .iter()
            .zip(&labels)
            .map(|(account, label)| (account.service.as_str(), label.as_str())),
    )
}

/// Counts by (service, hybrid label) over the joined rows.
pub fn hybrid_cross_tab(hybrid: &[HybridAccount]) -> CrossTab {
    build_tab(
        "Hybrid label by service",
        &HYBRID_COLUMNS,
        hybrid
            .iter()
            .map(|row| (row.service.as_str(), row.hybrid_label.as_str())),
    )
}

/// Raw-scale mean of every feature per cluster, in [`FEATURE_NAMES`] order.
pub fn cluster_feature_means(output: &ClusteringOutput) -> Vec<FeatureClusterMeans> {
    let mut sums = vec![[0.0f64; 2]; FEATURE_NAMES.len()];
    let mut counts = [0usize; 2];
    for (account, &cluster) in output.features.iter().zip(&output.assignments) {
        counts[cluster] += 1;
        for (j, value) in features::to_vector(account).into_iter().enumerate() {
            sums[j][cluster] += value;
        }
    }

    FEATURE_NAMES
        .iter()
        .enumerate()
        .map(|(j, name)| FeatureClusterMeans {
            feature: name.to_string(),
            cluster0_mean: sums[j][0] / counts[0].max(1) as f64,
            cluster1_mean: sums[j][1] / counts[1].max(1) as f64,
        })
        .collect()
}

/// Identifying facts about the run being summarized
#[derive(Debug, Clone)]
pub struct RunInfo {
    /// Unique id for this pipeline run
    pub run_id: String,
    /// Seed used for k-means and t-SNE
    pub seed: u64,
    /// Sessions remaining after ingest filtering
    pub sessions_ingested: usize,
    /// Sessions remaining after negative-gap drops
    pub sessions_augmented: usize,
}

/// Assemble everything the report and the metadata sidecar need.
///
/// The heuristic and cluster tabs are built from the pre-join strategy
/// tables; the hybrid tab from the joined rows.
pub fn build_artifacts(
    info: RunInfo,
    clustering: &ClusteringOutput,
    ad_supported_cluster: usize,
    aggregates: &[AccountAggregate],
    hybrid: &[HybridAccount],
    stats: JoinStats,
) -> ReportArtifacts {
    ReportArtifacts {
        run_id: info.run_id,
        pipeline_version: crate::PIPELINE_VERSION.to_string(),
        generated_at: Utc::now(),
        seed: info.seed,
        sessions_ingested: info.sessions_ingested,
        sessions_augmented: info.sessions_augmented,
        accounts_joined: stats.joined,
        dropped_heuristic_only: stats.dropped_heuristic_only,
        dropped_cluster_only: stats.dropped_cluster_only,
        ad_supported_cluster,
        cluster_sizes: clustering.cluster_sizes,
        importance: clustering.importance.clone(),
        cluster_means: cluster_feature_means(clustering),
        cross_tabs: vec![
            heuristic_cross_tab(aggregates),
            cluster_cross_tab(clustering, ad_supported_cluster),
            hybrid_cross_tab(hybrid),
        ],
    }
}

fn build_tab<'a>(
    title: &str,
    columns: &[&str],
    rows: impl Iterator<Item = (&'a str, &'a str)>,
) -> CrossTab {
    let mut services: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for (service, label) in rows {
        let counts = services
            .entry(service.to_string())
            .or_insert_with(|| vec![0; columns.len()]);
        if let Some(index) = columns.iter().position(|column| *column == label) {
            counts[index] += 1;
        }
    }

    let (services, counts) = services.into_iter().unzip();
    CrossTab {
        title: title.to_string(),
        services,
        columns: columns.iter().map(|column| column.to_string()).collect(),
        counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountFeatures, HybridLabel, PlanLabel};
    use pretty_assertions::assert_eq;

    fn make_hybrid(
        account: &str,
        service: &str,
        ratio_label: PlanLabel,
        cluster_label: PlanLabel,
        hybrid_label: HybridLabel,
    ) -> HybridAccount {
        HybridAccount {
            account_id: account.to_string(),
            service: service.to_string(),
            total_sessions: 10,
            eligible_sessions: 10,
            avg_duration_min: 30.0,
            gap_count: 4,
            avg_gap_min: Some(1.2),
            gap_ratio: Some(0.4),
            label_by_ratio: ratio_label,
            label_by_count: ratio_label,
            cluster: 0,
            cluster_label,
            hybrid_label,
        }
    }

    fn make_features(
        account: &str,
        service: &str,
        gap_session_ratio: f64,
        total: u32,
    ) -> AccountFeatures {
        AccountFeatures {
            account_id: account.to_string(),
            service: service.to_string(),
            total_sessions: total,
            avg_session_duration: 30.0,
            std_session_duration: 0.0,
            gap_session_ratio,
            gap_eligible_ratio: gap_session_ratio,
            avg_gap_length: 1.0,
            sessions_with_gap: 0,
            sessions_with_gap_eligible: 0,
        }
    }

    fn make_aggregate(account: &str, service: &str, label: PlanLabel) -> AccountAggregate {
        AccountAggregate {
            account_id: account.to_string(),
            service: service.to_string(),
            total_sessions: 10,
            eligible_sessions: 10,
            avg_duration_min: 30.0,
            gap_count: 4,
            avg_gap_min: Some(1.2),
            gap_ratio: Some(0.4),
            label_by_ratio: label,
            label_by_count: label,
        }
    }

    #[test]
    fn test_cross_tab_counts_and_zero_fill() {
        let aggregates = vec![
            make_aggregate("a", "Netflix", PlanLabel::AdSupported),
            make_aggregate("b", "Netflix", PlanLabel::AdSupported),
            make_aggregate("c", "Hulu", PlanLabel::AdFree),
        ];

        let tab = heuristic_cross_tab(&aggregates);
        assert_eq!(tab.services, vec!["Hulu".to_string(), "Netflix".to_string()]);
        assert_eq!(tab.columns, vec!["ad-free", "ad-supported"]);
        // Hulu: 1 ad-free, 0 ad-supported; Netflix: 0 ad-free, 2 ad-supported
        assert_eq!(tab.counts, vec![vec![1, 0], vec![0, 2]]);
    }

    #[test]
    fn test_hybrid_tab_spans_all_four_labels() {
        let rows = vec![
            make_hybrid(
                "a",
                "Netflix",
                PlanLabel::AdSupported,
                PlanLabel::AdSupported,
                HybridLabel::VeryLikelyAdSupported,
            ),
            make_hybrid(
                "b",
                "Netflix",
                PlanLabel::AdSupported,
                PlanLabel::AdFree,
                HybridLabel::AdSupported,
            ),
            make_hybrid(
                "c",
                "Hulu",
                PlanLabel::AdFree,
                PlanLabel::AdFree,
                HybridLabel::VeryLikelyAdFree,
            ),
        ];

        let tab = hybrid_cross_tab(&rows);
        assert_eq!(tab.columns.len(), 4);
        assert_eq!(tab.counts, vec![vec![0, 0, 1, 0], vec![0, 1, 0, 1]]);
    }

    #[test]
    fn test_cluster_tab_maps_ids_through_ad_cluster() {
        let output = ClusteringOutput {
            features: vec![
                make_features("a", "Netflix", 0.8, 10),
                make_features("b", "Netflix", 0.7, 10),
                make_features("c", "Hulu", 0.0, 10),
            ],
            assignments: vec![0, 0, 1],
            cluster_sizes: [2, 1],
            pca: Vec::new(),
            tsne: Vec::new(),
            importance: Vec::new(),
        };

        // Hulu's account sits in cluster 1, ad-free when cluster 0 is the
        // ad-supported one
        let tab = cluster_cross_tab(&output, 0);
        assert_eq!(tab.counts, vec![vec![1, 0], vec![0, 2]]);

        let flipped = cluster_cross_tab(&output, 1);
        assert_eq!(flipped.counts, vec![vec![0, 1], vec![2, 0]]);
    }

    #[test]
    fn test_strategy_tabs_count_accounts_lost_in_join() {
        // "orphan" was never clustered and "stray" was never aggregated;
        // the join keeps neither, but each still counts in its own
        // strategy's tab
        let aggregates = vec![
            make_aggregate("a", "Netflix", PlanLabel::AdSupported),
            make_aggregate("orphan", "Netflix", PlanLabel::AdFree),
        ];
        let output = ClusteringOutput {
            features: vec![
                make_features("a", "Netflix", 0.8, 10),
                make_features("stray", "Hulu", 0.0, 10),
            ],
            assignments: vec![0, 1],
            cluster_sizes: [1, 1],
            pca: Vec::new(),
            tsne: Vec::new(),
            importance: Vec::new(),
        };
        let joined = vec![make_hybrid(
            "a",
            "Netflix",
            PlanLabel::AdSupported,
            PlanLabel::AdSupported,
            HybridLabel::VeryLikelyAdSupported,
        )];

        let heuristic = heuristic_cross_tab(&aggregates);
        assert_eq!(heuristic.services, vec!["Netflix".to_string()]);
        assert_eq!(heuristic.counts, vec![vec![1, 1]]);

        let cluster = cluster_cross_tab(&output, 0);
        assert_eq!(
            cluster.services,
            vec!["Hulu".to_string(), "Netflix".to_string()]
        );
        assert_eq!(cluster.counts, vec![vec![1, 0], vec![0, 1]]);

        let hybrid = hybrid_cross_tab(&joined);
        let total: u32 = hybrid.counts.iter().flatten().sum();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_cluster_feature_means_split_by_assignment() {
        let output = ClusteringOutput {
            features: vec![
                make_features("a", "Netflix", 0.8, 10),
                make_features("b", "Netflix", 0.6, 20),
                make_features("c", "Netflix", 0.0, 30),
            ],
            assignments: vec![0, 0, 1],
            cluster_sizes: [2, 1],
            pca: Vec::new(),
            tsne: Vec::new(),
            importance: Vec::new(),
        };

        let means = cluster_feature_means(&output);
        assert_eq!(means.len(), FEATURE_NAMES.len());

        let total = means.iter().find(|m| m.feature == "total_sessions").unwrap();
        assert!((total.cluster0_mean - 15.0).abs() < 1e-9);
        assert!((total.cluster1_mean - 30.0).abs() < 1e-9);

        let ratio = means
            .iter()
            .find(|m| m.feature == "gap_session_ratio")
            .unwrap();
        assert!((ratio.cluster0_mean - 0.7).abs() < 1e-9);
        assert!((ratio.cluster1_mean - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_artifacts_bundles_everything() {
        let output = ClusteringOutput {
            features: vec![
                make_features("a", "Netflix", 0.8, 10),
                make_features("b", "Netflix", 0.0, 10),
            ],
            assignments: vec![0, 1],
            cluster_sizes: [1, 1],
            pca: vec![(0.0, 0.0), (1.0, 1.0)],
            tsne: vec![(0.0, 0.0), (1.0, 1.0)],
            importance: Vec::new(),
        };
        let aggregates = vec![make_aggregate("a", "Netflix", PlanLabel::AdSupported)];
        let rows = vec![make_hybrid(
            "a",
            "Netflix",
            PlanLabel::AdSupported,
            PlanLabel::AdSupported,
            HybridLabel::VeryLikelyAdSupported,
        )];
        let stats = JoinStats {
            joined: 1,
            dropped_heuristic_only: 0,
            dropped_cluster_only: 1,
        };

        let info = RunInfo {
            run_id: "run-1".to_string(),
            seed: 42,
            sessions_ingested: 100,
            sessions_augmented: 98,
        };
        let artifacts = build_artifacts(info, &output, 0, &aggregates, &rows, stats);

        assert_eq!(artifacts.run_id, "run-1");
        assert_eq!(artifacts.seed, 42);
        assert_eq!(artifacts.sessions_ingested, 100);
        assert_eq!(artifacts.sessions_augmented, 98);
        assert_eq!(artifacts.accounts_joined, 1);
        assert_eq!(artifacts.dropped_cluster_only, 1);
        assert_eq!(artifacts.cross_tabs.len(), 3);
        assert_eq!(artifacts.cross_tabs[0].title, "Heuristic label by service");
        assert_eq!(artifacts.cross_tabs[1].title, "Cluster label by service");
        assert_eq!(artifacts.cross_tabs[2].title, "Hybrid label by service");
        // the cluster tab covers both clustered accounts, not just the
        // single joined row
        assert_eq!(artifacts.cross_tabs[1].counts, vec![vec![1, 1]]);
        assert_eq!(artifacts.cluster_means.len(), FEATURE_NAMES.len());
        assert_eq!(artifacts.pipeline_version, crate::PIPELINE_VERSION);
    }
}
