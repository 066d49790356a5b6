//! Moisture analytics core: trends, hotspots, statistics and the memoizing
//! service that composes them.
//!
//! Everything in here is synchronous and free of I/O; the HTTP layer fetches
//! readings first and hands them to [`AnalyticsService::analyze`].

use std::fmt;
use std::str::FromStr;

mod cache;
mod hotspot;
mod service;
mod statistics;
mod trend;

pub use cache::{canonical_order, fingerprint, AnalysisCache};
pub use hotspot::{detect_hotspots, MIN_HOTSPOT_READINGS};
pub use service::{Analysis, AnalyticsService};
pub use statistics::{aggregate, day_start, hour_start};
pub use trend::{calculate_trend, select_overall, MIN_TREND_READINGS};

// ---

/// Rule for choosing the single headline trend across locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrendSelection {
    /// Location with the most readings; ties go to the most recent.
    #[default]
    MostReadings,
    /// Location whose readings end latest; ties go to the most readings.
    MostRecent,
}

impl FromStr for TrendSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "most_readings" => Ok(TrendSelection::MostReadings),
            "most_recent" => Ok(TrendSelection::MostRecent),
            other => Err(format!(
                "unknown trend selection '{other}', expected most_readings or most_recent"
            )),
        }
    }
}

impl fmt::Display for TrendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendSelection::MostReadings => f.write_str("most_readings"),
            TrendSelection::MostRecent => f.write_str("most_recent"),
        }
    }
}

/// Tunables for one [`AnalyticsService`] instance.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub hotspot_threshold: f64,
    pub hotspot_radius: f64,
    pub trend_stable_epsilon: f64,
    pub trend_selection: TrendSelection,
    pub cache_max_entries: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            hotspot_threshold: 20.0,
            hotspot_radius: 1.0,
            trend_stable_epsilon: 0.25,
            trend_selection: TrendSelection::MostReadings,
            cache_max_entries: 256,
        }
    }
}
