//! Ad-break gap rules
//!
//! Service-specific assumptions about how long an ad break interrupts
//! playback live here and nowhere else. The flag logic consults the table
//! through [`AdBreakRules::matches`]; adding a service means adding a row,
//! not touching the scan.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum session length for a session to have carried ad breaks (minutes)
pub const AD_ELIGIBLE_MIN_DURATION_MIN: f64 = 15.0;

/// Gap ratio above which the heuristic labels an account ad-supported
pub const HEURISTIC_RATIO_THRESHOLD: f64 = 0.15;

/// Flagged-gap count above which the heuristic labels an account ad-supported
pub const HEURISTIC_COUNT_THRESHOLD: u32 = 3;

/// Inclusive gap window in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapWindow {
    /// Shortest gap that looks like an ad break
    pub min_min: f64,
    /// Longest gap that looks like an ad break
    pub max_min: f64,
}

impl GapWindow {
    pub fn new(min_min: f64, max_min: f64) -> Self {
        Self { min_min, max_min }
    }

    /// Both endpoints are inside the window.
    pub fn contains(&self, gap_min: f64) -> bool {
        gap_min >= self.min_min && gap_min <= self.max_min
    }
}

/// Per-service ad-break windows, keyed by service name
#[derive(Debug, Clone)]
pub struct AdBreakRules {
    windows: HashMap<String, GapWindow>,
}

impl Default for AdBreakRules {
    fn default() -> Self {
        let mut windows = HashMap::new();
        windows.insert("Netflix".to_string(), GapWindow::new(1.0, 1.5));
        windows.insert("Hulu".to_string(), GapWindow::new(1.5, 2.5));
        Self { windows }
    }
}

impl AdBreakRules {
    /// A table with no services; every gap check returns false.
    pub fn empty() -> Self {
        Self {
            windows: HashMap::new(),
        }
    }

    /// Add or replace the window for a service.
    pub fn insert(&mut self, service: impl Into<String>, window: GapWindow) {
        self.windows.insert(service.into(), window);
    }

    /// The window for a service, if the service is in the table.
    pub fn window_for(&self, service: &str) -> Option<GapWindow> {
        self.windows.get(service).copied()
    }

    /// Whether `gap_min` falls in the ad-break window of `service`.
    ///
    /// Services not in the table never match; unknown services are a
    /// deliberate "no evidence" answer, not an error.
    pub fn matches(&self, service: &str, gap_min: f64) -> bool {
        match self.windows.get(service) {
            Some(window) => window.contains(gap_min),
            None => false,
        }
    }

    /// Whether the service has a configured window.
    pub fn is_known(&self, service: &str) -> bool {
        self.windows.contains_key(service)
    }

    /// Configured service names, sorted for stable iteration.
    pub fn known_services(&self) -> Vec<String> {
        let mut services: Vec<String> = self.windows.keys().cloned().collect();
        services.sort();
        services
    }
}
