//! Heuristic ad-break labeler
//!
//! Scans each viewing group for the short playback gaps an ad break leaves
//! behind, then rolls the evidence up into two per-account rule labels:
//! - by ratio: flagged gaps / ad-eligible sessions > 0.15
//! - by count: flagged gaps > 3
//!
//! Gap measurement happens inside a group (same account, service, season,
//! episode); sessions never borrow a gap from a neighboring group.

use crate::rules::{
    AdBreakRules, AD_ELIGIBLE_MIN_DURATION_MIN, HEURISTIC_COUNT_THRESHOLD,
    HEURISTIC_RATIO_THRESHOLD,
};
use crate::types::{AccountAggregate, AugmentedSession, PlanLabel, Session};
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::collections::BTreeMap;

/// Run the gap scan and aggregation over cleaned sessions.
///
/// Returns per-account aggregates (sorted by account and service) together
/// with the gap-augmented session table. Rows whose measured gap is negative
/// are overlap artifacts and are dropped before flagging or aggregation;
/// gaps are measured once, on the original neighbor order, and never
/// recomputed after a drop.
pub fn compute_heuristics(
    mut sessions: Vec<Session>,
    rules: &AdBreakRules,
) -> (Vec<AccountAggregate>, Vec<AugmentedSession>) {
    // Stable ordering first: group, then start, then end so start-time ties
    // cannot reorder gaps between runs.
    sessions.sort_by(|a, b| {
        (&a.group_key, a.start_time, a.end_time).cmp(&(&b.group_key, b.start_time, b.end_time))
    });

    let mut augmented = Vec::with_capacity(sessions.len());
    let mut negative_gaps = 0usize;

    for (i, session) in sessions.iter().enumerate() {
        let gap_to_next_min = sessions
            .get(i + 1)
            .filter(|next| next.group_key == session.group_key)
            .map(|next| minutes_between(session.end_time, next.start_time));

        if let Some(gap) = gap_to_next_min {
            if gap < 0.0 {
                negative_gaps += 1;
                continue;
            }
        }

        let ad_eligible = session.duration_min >= AD_ELIGIBLE_MIN_DURATION_MIN;
        let gap_flag = match gap_to_next_min {
            Some(gap) => rules.matches(&session.service, gap),
            None => false,
        };
        let gap_flag_eligible = ad_eligible && gap_flag && gap_to_next_min.is_some();

        augmented.push(AugmentedSession {
            session: session.clone(),
            gap_to_next_min,
            ad_eligible,
            gap_flag,
            gap_flag_eligible,
        });
    }

    if negative_gaps > 0 {
        debug!("dropped {negative_gaps} sessions with negative gaps");
    }

    let aggregates = aggregate_accounts(&augmented);
    info!(
        "heuristic labeled {} accounts from {} sessions",
        aggregates.len(),
        augmented.len()
    );
    (aggregates, augmented)
}

/// Roll flagged sessions up to one aggregate per (account_id, service).
fn aggregate_accounts(augmented: &[AugmentedSession]) -> Vec<AccountAggregate> {
    #[derive(Default)]
    struct Acc {
        total: u32,
        eligible: u32,
        duration_sum: f64,
        gap_count: u32,
        flagged_gap_sum: f64,
    }

    let mut groups: BTreeMap<(String, String), Acc> = BTreeMap::new();
    for aug in augmented {
        let key = (aug.account_id().to_string(), aug.service().to_string());
        let acc = groups.entry(key).or_default();
        acc.total += 1;
        if aug.ad_eligible {
            acc.eligible += 1;
        }
        acc.duration_sum += aug.session.duration_min;
        if aug.gap_flag_eligible {
            acc.gap_count += 1;
            // gap_flag_eligible implies the gap exists
            acc.flagged_gap_sum += aug.gap_to_next_min.unwrap_or(0.0);
        }
    }

    groups
        .into_iter()
        .map(|((account_id, service), acc)| {
            let avg_gap_min = if acc.gap_count > 0 {
                Some(acc.flagged_gap_sum / f64::from(acc.gap_count))
            } else {
                None
            };
            let gap_ratio = if acc.eligible > 0 {
                Some(f64::from(acc.gap_count) / f64::from(acc.eligible))
            } else {
                None
            };
            // An undefined ratio is "no ad evidence possible", labeled
            // ad-free explicitly rather than falling out of a comparison.
            let label_by_ratio = match gap_ratio {
                Some(ratio) if ratio > HEURISTIC_RATIO_THRESHOLD => PlanLabel::AdSupported,
                _ => PlanLabel::AdFree,
            };
            let label_by_count = if acc.gap_count > HEURISTIC_COUNT_THRESHOLD {
                PlanLabel::AdSupported
            } else {
                PlanLabel::AdFree
            };

            AccountAggregate {
                account_id,
                service,
                total_sessions: acc.total,
                eligible_sessions: acc.eligible,
                avg_duration_min: acc.duration_sum / f64::from(acc.total),
                gap_count: acc.gap_count,
                avg_gap_min,
                gap_ratio,
                label_by_ratio,
                label_by_count,
            }
        })
        .collect()
}

fn minutes_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}
