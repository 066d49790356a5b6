//! Data models for the moisture analytics pipeline.
//!
//! Readings come in from the repository and are never mutated here; every
//! other type is a derived, transient response payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// A single timestamped moisture measurement at a named location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    // ---
    /// Moisture value (percent or WME scaled).
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

/// Row shape of the `moisture_readings` relation.
#[derive(Debug, sqlx::FromRow)]
pub struct ReadingRow {
    // ---
    pub location: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

impl Reading {
    // ---
    pub fn new(location: impl Into<String>, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            timestamp,
            location: location.into(),
            x: None,
            y: None,
            z: None,
        }
    }

    /// Attach 2-D coordinates.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Attach a height to an already positioned reading.
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Planar coordinates, if the reading is spatially tagged.
    pub fn position(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position { x, y, z: self.z }),
            _ => None,
        }
    }

    pub fn is_spatial(&self) -> bool {
        self.position().is_some()
    }
}

impl From<ReadingRow> for Reading {
    fn from(row: ReadingRow) -> Self {
        Reading {
            value: row.value,
            timestamp: row.recorded_at,
            location: row.location,
            x: row.x,
            y: row.y,
            z: row.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Position {
    /// Euclidean distance; 3-D only when both sides carry a height.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = match (self.z, other.z) {
            (Some(a), Some(b)) => a - b,
            _ => 0.0,
        };
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

/// Direction and strength of moisture change at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    // ---
    pub location: String,
    pub trend: TrendDirection,
    /// Goodness of fit, in `(0, 1]`.
    pub confidence: f64,
    /// Value units per hour.
    pub change_rate: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(skip)]
    pub sample_count: usize,
}

/// Per-location trends plus the single trend picked for the headline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub overall: Option<TrendResult>,
    pub locations: Vec<TrendResult>,
    /// Locations that had too few readings for a trend.
    pub insufficient_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub position: Position,
    pub max_value: f64,
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatBucket {
    pub period_start: DateTime<Utc>,
    pub location: String,
    pub count: usize,
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub hourly: Vec<StatBucket>,
    pub daily: Vec<StatBucket>,
}

/// Everything computed for one reading set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    // ---
    pub trends: Trends,
    pub hotspots: Vec<Hotspot>,
    pub statistics: Statistics,
    pub reading_count: usize,
    /// When the result was computed; preserved on cache hits.
    pub timestamp: DateTime<Utc>,
}
