//! Output serialization
//!
//! Flat-file outputs of a run:
//! - labeled-accounts CSV, one row per (account_id, service)
//! - gap-augmented sessions CSV for downstream inspection
//! - run-metadata JSON sidecar carrying the [`ReportArtifacts`] bundle
//!
//! CSV column layouts are owned here so the domain types stay nested.

use crate::error::PipelineError;
use crate::types::{AugmentedSession, HybridAccount, ReportArtifacts};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize)]
struct LabeledAccountRow<'a> {
    account_id: &'a str,
    service: &'a str,
    total_sessions: u32,
    eligible_sessions: u32,
    avg_duration_min: f64,
    gap_count: u32,
    avg_gap_min: Option<f64>,
    gap_ratio: Option<f64>,
    label_by_ratio: &'a str,
    label_by_count: &'a str,
    cluster: usize,
    cluster_label: &'a str,
    hybrid_label: &'a str,
}

#[derive(Debug, Serialize)]
struct AugmentedSessionRow<'a> {
    account_id: &'a str,
    service: &'a str,
    group_key: &'a str,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_min: f64,
    gap_to_next_min: Option<f64>,
    ad_eligible: bool,
    gap_flag: bool,
    gap_flag_eligible: bool,
}

/// Write the labeled-accounts CSV, one row per (account_id, service).
pub fn write_labeled_accounts(path: &Path, rows: &[HybridAccount]) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(LabeledAccountRow {
            account_id: &row.account_id,
            service: &row.service,
            total_sessions: row.total_sessions,
            eligible_sessions: row.eligible_sessions,
            avg_duration_min: row.avg_duration_min,
            gap_count: row.gap_count,
            avg_gap_min: row.avg_gap_min,
            gap_ratio: row.gap_ratio,
            label_by_ratio: row.label_by_ratio.as_str(),
            label_by_count: row.label_by_count.as_str(),
            cluster: row.cluster,
            cluster_label: row.cluster_label.as_str(),
            hybrid_label: row.hybrid_label.as_str(),
        })?;
    }
    writer.flush()?;
    info!("wrote {} labeled accounts to {}", rows.len(), path.display());
    Ok(())
}

/// Write the gap-augmented session table.
pub fn write_augmented_sessions(
    path: &Path,
    augmented: &[AugmentedSession],
) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for aug in augmented {
        writer.serialize(AugmentedSessionRow {
            account_id: aug.account_id(),
            service: aug.service(),
            group_key: &aug.session.group_key,
            start_time: aug.session.start_time,
            end_time: aug.session.end_time,
            duration_min: aug.session.duration_min,
            gap_to_next_min: aug.gap_to_next_min,
            ad_eligible: aug.ad_eligible,
            gap_flag: aug.gap_flag,
            gap_flag_eligible: aug.gap_flag_eligible,
        })?;
    }
    writer.flush()?;
    info!(
        "wrote {} augmented sessions to {}",
        augmented.len(),
        path.display()
    );
    Ok(())
}

/// Write the run-metadata sidecar as pretty JSON.
pub fn write_run_metadata(path: &Path, artifacts: &ReportArtifacts) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(artifacts)?;
    fs::write(path, json)?;
    info!("wrote run metadata to {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
