//! Raw session ingestion
//!
//! Reads the raw viewing-log CSV and produces the cleaned [`Session`] table
//! the rest of the pipeline runs on:
//! - validates the header up front; a missing required column is fatal
//! - keeps only OTT rows for services present in the rule table
//! - drops excluded titles, unparseable rows, and sub-minute sessions
//! - converts durations to minutes and builds the gap-scan group key
//!
//! Row-level problems are drops, not errors; drop counts are logged.

use crate::error::PipelineError;
use crate::rules::AdBreakRules;
use crate::types::Session;
use chrono::{DateTime, NaiveDateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Sessions at or below this raw duration are noise, not viewing (seconds)
pub const MIN_DURATION_SECS: f64 = 60.0;

/// Content type marker for streaming rows in the raw export
const OTT_CONTENT_TYPE: &str = "OTT";

/// Columns the raw export must carry
const REQUIRED_COLUMNS: [&str; 9] = [
    "tv_id",
    "service",
    "start_time",
    "end_time",
    "duration",
    "content_type",
    "exclude_title",
    "season_id",
    "episode",
];

/// One raw CSV row; extra columns are ignored, absent values tolerated
#[derive(Debug, Deserialize)]
struct RawSessionRow {
    #[serde(default)]
    tv_id: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    exclude_title: Option<String>,
    #[serde(default)]
    season_id: Option<String>,
    #[serde(default)]
    episode: Option<String>,
}

/// Load and clean the raw session CSV.
///
/// Returns the cleaned sessions, or an error when the header is invalid or
/// nothing survives filtering.
pub fn load_sessions(path: &Path, rules: &AdBreakRules) -> Result<Vec<Session>, PipelineError> {
    let mut reader = csv::Reader::from_path(path)?;
    validate_header(&mut reader)?;

    let mut sessions = Vec::new();
    let mut rows_read = 0usize;
    let mut malformed = 0usize;
    let mut wrong_content_type = 0usize;
    let mut unknown_service = 0usize;
    let mut excluded_title = 0usize;
    let mut missing_data = 0usize;
    let mut too_short = 0usize;

    for result in reader.deserialize::<RawSessionRow>() {
        rows_read += 1;
        let row = match result {
            Ok(row) => row,
            Err(_) => {
                malformed += 1;
                continue;
            }
        };

        if row.content_type.as_deref() != Some(OTT_CONTENT_TYPE) {
            wrong_content_type += 1;
            continue;
        }
        let service = match row.service {
            Some(ref service) if rules.is_known(service) => service.clone(),
            _ => {
                unknown_service += 1;
                continue;
            }
        };
        match row.exclude_title.as_deref().and_then(parse_flag) {
            Some(false) => {}
            Some(true) => {
                excluded_title += 1;
                continue;
            }
            None => {
                missing_data += 1;
                continue;
            }
        }

        let account_id = match row.tv_id {
            Some(ref id) if !id.is_empty() => id.clone(),
            _ => {
                missing_data += 1;
                continue;
            }
        };
        let season_id = match row.season_id {
            Some(ref season) if !season.is_empty() => season.clone(),
            _ => {
                missing_data += 1;
                continue;
            }
        };
        let (start_time, end_time) = match (
            row.start_time.as_deref().and_then(parse_utc),
            row.end_time.as_deref().and_then(parse_utc),
        ) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                missing_data += 1;
                continue;
            }
        };
        let duration_secs = match row.duration {
            Some(secs) if secs.is_finite() => secs,
            _ => {
                missing_data += 1;
                continue;
            }
        };
        if duration_secs <= MIN_DURATION_SECS {
            too_short += 1;
            continue;
        }

        let episode = row.episode.unwrap_or_default();
        let group_key = format!("{account_id}_{service}_{season_id}_{episode}");

        sessions.push(Session {
            account_id,
            service,
            group_key,
            start_time,
            end_time,
            duration_min: duration_secs / 60.0,
        });
    }

    let dropped = rows_read - sessions.len();
    if dropped > 0 {
        warn!(
            "ingest dropped {dropped} of {rows_read} rows \
             (malformed {malformed}, content-type {wrong_content_type}, \
             service {unknown_service}, excluded {excluded_title}, \
             missing {missing_data}, short {too_short})"
        );
    }
    info!("ingested {} sessions from {}", sessions.len(), path.display());

    if sessions.is_empty() {
        return Err(PipelineError::NoSessions(format!(
            "{} rows read, all filtered out",
            rows_read
        )));
    }
    Ok(sessions)
}

fn validate_header(reader: &mut csv::Reader<std::fs::File>) -> Result<(), PipelineError> {
    let headers = reader.headers()?;
    let present: HashSet<&str> = headers.iter().collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !present.contains(**column))
        .map(|column| column.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumns(missing))
    }
}

/// Accepts RFC3339 and the "2024-03-01 20:00:00" form common in warehouse
/// exports; naive timestamps are taken as UTC.
fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// Python-style and lowercase boolean spellings both appear in exports.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
