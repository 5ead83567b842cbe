//! Hybrid label reconciliation
//!
//! Two responsibilities, both outside the clusterer on purpose:
//! - decide which raw cluster id means "ad-supported" (the cluster whose
//!   accounts carry the higher mean gap_session_ratio, on raw feature scale)
//! - inner-join heuristic aggregates with cluster labels and reconcile the
//!   two strategies into the final hybrid label
//!
//! Agreement upgrades confidence; disagreement defers to the heuristic.

use crate::types::{
    AccountAggregate, ClusteringOutput, HybridAccount, HybridLabel, PlanLabel,
};
use log::warn;
use std::collections::HashMap;

/// Join bookkeeping for the inner join behind [`combine_labels`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinStats {
    /// Accounts present on both sides
    pub joined: usize,
    /// Heuristic-side accounts with no cluster row
    pub dropped_heuristic_only: usize,
    /// Clustered accounts with no heuristic row
    pub dropped_cluster_only: usize,
}

/// The cluster id whose accounts look ad-supported.
///
/// Compares the per-cluster mean of the raw gap_session_ratio feature;
/// a tie goes to cluster 1.
pub fn ad_supported_cluster(output: &ClusteringOutput) -> usize {
    let mut sums = [0.0f64; 2];
    let mut counts = [0usize; 2];
    for (features, &cluster) in output.features.iter().zip(&output.assignments) {
        sums[cluster] += features.gap_session_ratio;
        counts[cluster] += 1;
    }
    let mean0 = sums[0] / counts[0].max(1) as f64;
    let mean1 = sums[1] / counts[1].max(1) as f64;
    if mean0 > mean1 {
        0
    } else {
        1
    }
}

/// Plan label per clustered account, parallel to `output.features`.
pub fn cluster_plan_labels(output: &ClusteringOutput, ad_cluster: usize) -> Vec<PlanLabel> {
    output
        .assignments
        .iter()
        .map(|&cluster| {
            if cluster == ad_cluster {
                PlanLabel::AdSupported
            } else {
                PlanLabel::AdFree
            }
        })
        .collect()
}

/// Inner-join heuristic aggregates with cluster labels on
/// (account_id, service) and reconcile.
///
/// Rows existing on only one side are dropped; the drop counts are
/// returned and logged so silent shrinkage cannot happen.
pub fn combine_labels(
    aggregates: &[AccountAggregate],
    output: &ClusteringOutput,
    cluster_labels: &[PlanLabel],
) -> (Vec<HybridAccount>, JoinStats) {
    let mut by_key: HashMap<(&str, &str), (usize, PlanLabel)> = HashMap::new();
    for ((features, &cluster), &label) in output
        .features
        .iter()
        .zip(&output.assignments)
        .zip(cluster_labels)
    {
        by_key.insert(
            (features.account_id.as_str(), features.service.as_str()),
            (cluster, label),
        );
    }

    let mut hybrid = Vec::with_capacity(aggregates.len());
    for agg in aggregates {
        let Some(&(cluster, cluster_label)) =
            by_key.get(&(agg.account_id.as_str(), agg.service.as_str()))
        else {
            continue;
        };
        hybrid.push(HybridAccount {
            account_id: agg.account_id.clone(),
            service: agg.service.clone(),
            total_sessions: agg.total_sessions,
            eligible_sessions: agg.eligible_sessions,
            avg_duration_min: agg.avg_duration_min,
            gap_count: agg.gap_count,
            avg_gap_min: agg.avg_gap_min,
            gap_ratio: agg.gap_ratio,
            label_by_ratio: agg.label_by_ratio,
            label_by_count: agg.label_by_count,
            cluster,
            cluster_label,
            hybrid_label: reconcile(agg.label_by_ratio, cluster_label),
        });
    }

    let stats = JoinStats {
        joined: hybrid.len(),
        dropped_heuristic_only: aggregates.len() - hybrid.len(),
        dropped_cluster_only: output.features.len() - hybrid.len(),
    };
    if stats.dropped_heuristic_only > 0 || stats.dropped_cluster_only > 0 {
        warn!(
            "hybrid join dropped {} heuristic-only and {} cluster-only accounts",
            stats.dropped_heuristic_only, stats.dropped_cluster_only
        );
    }
    (hybrid, stats)
}

/// Agreement upgrades to "very likely"; disagreement echoes the heuristic.
fn reconcile(heuristic: PlanLabel, cluster: PlanLabel) -> HybridLabel {
    match (heuristic, cluster) {
        (PlanLabel::AdSupported, PlanLabel::AdSupported) => HybridLabel::VeryLikelyAdSupported,
        (PlanLabel::AdFree, PlanLabel::AdFree) => HybridLabel::VeryLikelyAdFree,
        (PlanLabel::AdSupported, PlanLabel::AdFree) => HybridLabel::AdSupported,
        (PlanLabel::AdFree, PlanLabel::AdSupported) => HybridLabel::AdFree,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AccountFeatures;
    use pretty_assertions::assert_eq;

    fn make_features(account: &str, service: &str, gap_session_ratio: f64) -> AccountFeatures {
        AccountFeatures {
            account_id: account.to_string(),
            service: service.to_string(),
            total_sessions: 10,
            avg_session_duration: 30.0,
            std_session_duration: 5.0,
            gap_session_ratio,
            gap_eligible_ratio: gap_session_ratio,
            avg_gap_length: 1.2,
            sessions_with_gap: (gap_session_ratio * 10.0) as u32,
            sessions_with_gap_eligible: (gap_session_ratio * 10.0) as u32,
        }
    }

    fn make_output(features: Vec<AccountFeatures>, assignments: Vec<usize>) -> ClusteringOutput {
        let mut cluster_sizes = [0usize; 2];
        for &cluster in &assignments {
            cluster_sizes[cluster] += 1;
        }
        ClusteringOutput {
            features,
            assignments,
            cluster_sizes,
            pca: Vec::new(),
            tsne: Vec::new(),
            importance: Vec::new(),
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
    fn test_higher_gap_ratio_cluster_is_ad_supported() {
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.8),
                make_features("b", "Netflix", 0.7),
                make_features("c", "Netflix", 0.0),
                make_features("d", "Netflix", 0.1),
            ],
            vec![0, 0, 1, 1],
        );
        assert_eq!(ad_supported_cluster(&output), 0);

        // swap the assignment and the answer follows the data
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.8),
                make_features("b", "Netflix", 0.0),
            ],
            vec![1, 0],
        );
        assert_eq!(ad_supported_cluster(&output), 1);
    }

    #[test]
    fn test_tied_means_resolve_to_cluster_one() {
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.5),
                make_features("b", "Netflix", 0.5),
            ],
            vec![0, 1],
        );
        assert_eq!(ad_supported_cluster(&output), 1);
    }

    #[test]
    fn test_cluster_plan_labels_follow_semantic_id() {
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.8),
                make_features("b", "Netflix", 0.0),
            ],
            vec![0, 1],
        );
        let labels = cluster_plan_labels(&output, 0);
        assert_eq!(labels, vec![PlanLabel::AdSupported, PlanLabel::AdFree]);
    }

    #[test]
    fn test_reconcile_covers_all_combinations() {
        assert_eq!(
            reconcile(PlanLabel::AdSupported, PlanLabel::AdSupported),
            HybridLabel::VeryLikelyAdSupported
        );
        assert_eq!(
            reconcile(PlanLabel::AdFree, PlanLabel::AdFree),
            HybridLabel::VeryLikelyAdFree
        );
        // disagreements echo the heuristic verbatim
        assert_eq!(
            reconcile(PlanLabel::AdSupported, PlanLabel::AdFree),
            HybridLabel::AdSupported
        );
        assert_eq!(
            reconcile(PlanLabel::AdFree, PlanLabel::AdSupported),
            HybridLabel::AdFree
        );
    }

    #[test]
    fn test_combine_labels_joins_on_account_and_service() {
        let aggregates = vec![
            make_aggregate("a", "Netflix", PlanLabel::AdSupported),
            make_aggregate("a", "Hulu", PlanLabel::AdFree),
        ];
        let output = make_output(
            vec![
                make_features("a", "Hulu", 0.0),
                make_features("a", "Netflix", 0.8),
            ],
            vec![1, 0],
        );
        let labels = cluster_plan_labels(&output, 0);

        let (hybrid, stats) = combine_labels(&aggregates, &output, &labels);
        assert_eq!(hybrid.len(), 2);
        assert_eq!(
            stats,
            JoinStats {
                joined: 2,
                dropped_heuristic_only: 0,
                dropped_cluster_only: 0
            }
        );

        let netflix = hybrid.iter().find(|h| h.service == "Netflix").unwrap();
        assert_eq!(netflix.cluster, 0);
        assert_eq!(netflix.cluster_label, PlanLabel::AdSupported);
        assert_eq!(netflix.hybrid_label, HybridLabel::VeryLikelyAdSupported);

        let hulu = hybrid.iter().find(|h| h.service == "Hulu").unwrap();
        assert_eq!(hulu.cluster_label, PlanLabel::AdFree);
        assert_eq!(hulu.hybrid_label, HybridLabel::VeryLikelyAdFree);
    }

    #[test]
    fn test_same_inputs_reproduce_hybrid_output() {
        let aggregates = vec![
            make_aggregate("a", "Netflix", PlanLabel::AdSupported),
            make_aggregate("b", "Hulu", PlanLabel::AdFree),
            make_aggregate("orphan", "Netflix", PlanLabel::AdFree),
        ];
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.8),
                make_features("b", "Hulu", 0.1),
            ],
            vec![0, 1],
        );
        let labels = cluster_plan_labels(&output, 0);

        let first = combine_labels(&aggregates, &output, &labels);
        let second = combine_labels(&aggregates, &output, &labels);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unmatched_rows_are_dropped_and_counted() {
        let aggregates = vec![
            make_aggregate("a", "Netflix", PlanLabel::AdSupported),
            make_aggregate("orphan", "Netflix", PlanLabel::AdFree),
        ];
        let output = make_output(
            vec![
                make_features("a", "Netflix", 0.8),
                make_features("stray", "Hulu", 0.0),
            ],
            vec![0, 1],
        );
        let labels = cluster_plan_labels(&output, 0);

        let (hybrid, stats) = combine_labels(&aggregates, &output, &labels);
        assert_eq!(hybrid.len(), 1);
        assert_eq!(hybrid[0].account_id, "a");
        assert_eq!(
            stats,
            JoinStats {
                joined: 1,
                dropped_heuristic_only: 1,
                dropped_cluster_only: 1
            }
        );
    }

    #[test]
    fn test_disagreement_echoes_heuristic() {
        // heuristic says ad-supported, cluster says ad-free
        let aggregates = vec![make_aggregate("a", "Netflix", PlanLabel::AdSupported)];
        let output = make_output(vec![make_features("a", "Netflix", 0.1)], vec![0]);
        let labels = vec![PlanLabel::AdFree];

        let (hybrid, _) = combine_labels(&aggregates, &output, &labels);
        assert_eq!(hybrid[0].hybrid_label, HybridLabel::AdSupported);
    }
}
