//! Label a handful of in-memory viewing sessions and print the hybrid output

use chrono::{Duration, TimeZone, Utc};
use planscope::clustering::perform_clustering;
use planscope::heuristic::compute_heuristics;
use planscope::hybrid::{ad_supported_cluster, cluster_plan_labels, combine_labels};
use planscope::rules::AdBreakRules;
use planscope::types::Session;
use planscope::DEFAULT_SEED;

/// Five back-to-back episode sessions with a fixed break between them.
fn account_sessions(
    account_id: &str,
    service: &str,
    gap_min: f64,
    duration_min: f64,
) -> Vec<Session> {
    let mut start = Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap();
    let mut sessions = Vec::new();
    for _ in 0..5 {
        let end = start + Duration::seconds((duration_min * 60.0) as i64);
        sessions.push(Session {
            account_id: account_id.to_string(),
            service: service.to_string(),
            group_key: format!("{account_id}_{service}_s1_e1"),
            start_time: start,
            end_time: end,
            duration_min,
        });
        start = end + Duration::seconds((gap_min * 60.0) as i64);
    }
    sessions
}

fn main() {
    let rules = AdBreakRules::default();

    let mut sessions = Vec::new();
    sessions.extend(account_sessions("viewer-1", "Netflix", 1.2, 31.0));
    sessions.extend(account_sessions("viewer-2", "Netflix", 1.3, 28.0));
    sessions.extend(account_sessions("viewer-3", "Hulu", 2.0, 34.0));
    sessions.extend(account_sessions("viewer-4", "Netflix", 5.0, 47.0));
    sessions.extend(account_sessions("viewer-5", "Netflix", 6.5, 44.0));
    sessions.extend(account_sessions("viewer-6", "Hulu", 7.0, 50.0));

    let (aggregates, augmented) = compute_heuristics(sessions, &rules);

    match perform_clustering(&augmented, DEFAULT_SEED) {
        Ok(clustering) => {
            let ad_cluster = ad_supported_cluster(&clustering);
            let labels = cluster_plan_labels(&clustering, ad_cluster);
            let (accounts, _) = combine_labels(&aggregates, &clustering, &labels);

            println!(
                "{:<10} {:<8} {:>7} {:>5}  {:<13} {:<13} hybrid",
                "account", "service", "cluster", "gaps", "heuristic", "cluster label"
            );
            for account in accounts {
                println!(
                    "{:<10} {:<8} {:>7} {:>5}  {:<13} {:<13} {}",
                    account.account_id,
                    account.service,
                    account.cluster,
                    account.gap_count,
                    account.label_by_ratio,
                    account.cluster_label,
                    account.hybrid_label,
                );
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
