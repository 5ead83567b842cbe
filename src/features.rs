//! Per-account clustering features
//!
//! Aggregates gap-augmented sessions into the fixed 8-dimensional feature
//! vector the clusterer consumes. Feature order is frozen by
//! [`FEATURE_NAMES`]; aggregates that are undefined for an account (no
//! second session, no gaps) are imputed to 0.0 so every account yields a
//! complete vector.

use crate::types::{AccountFeatures, AugmentedSession};
use std::collections::BTreeMap;

/// Canonical feature order for matrices, importances, and report panels
pub const FEATURE_NAMES: [&str; 8] = [
    "total_sessions",
    "avg_session_duration",
    "std_session_duration",
    "gap_session_ratio",
    "gap_eligible_ratio",
    "avg_gap_length",
    "sessions_with_gap",
    "sessions_with_gap_eligible",
];

/// Aggregate augmented sessions into one feature vector per
/// (account_id, service), sorted by that key.
pub fn aggregate_accounts(augmented: &[AugmentedSession]) -> Vec<AccountFeatures> {
    let mut groups: BTreeMap<(String, String), Vec<&AugmentedSession>> = BTreeMap::new();
    for aug in augmented {
        groups
            .entry((aug.account_id().to_string(), aug.service().to_string()))
            .or_default()
            .push(aug);
    }

    groups
        .into_iter()
        .map(|((account_id, service), rows)| {
            let durations: Vec<f64> = rows.iter().map(|r| r.session.duration_min).collect();
            let gaps: Vec<f64> = rows.iter().filter_map(|r| r.gap_to_next_min).collect();
            let sessions_with_gap = rows.iter().filter(|r| r.gap_flag).count() as u32;
            let sessions_with_gap_eligible =
                rows.iter().filter(|r| r.gap_flag_eligible).count() as u32;
            let total = rows.len() as u32;

            AccountFeatures {
                account_id,
                service,
                total_sessions: total,
                avg_session_duration: compute_mean(&durations),
                std_session_duration: compute_sample_std(&durations),
                gap_session_ratio: f64::from(sessions_with_gap) / f64::from(total),
                gap_eligible_ratio: f64::from(sessions_with_gap_eligible) / f64::from(total),
                avg_gap_length: compute_mean(&gaps),
                sessions_with_gap,
                sessions_with_gap_eligible,
            }
        })
        .collect()
}

/// The feature vector in [`FEATURE_NAMES`] order.
pub fn to_vector(features: &AccountFeatures) -> [f64; 8] {
    [
        f64::from(features.total_sessions),
        features.avg_session_duration,
        features.std_session_duration,
        features.gap_session_ratio,
        features.gap_eligible_ratio,
        features.avg_gap_length,
        f64::from(features.sessions_with_gap),
        f64::from(features.sessions_with_gap_eligible),
    ]
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn compute_mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0.0 below two values.
pub fn compute_sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = compute_mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}
