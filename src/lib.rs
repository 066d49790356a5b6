//! Moisture-reading analytics for restoration inspections.
//!
//! The crate validates time-windowed analytics requests, loads readings
//! through a [`ReadingRepository`], and derives per-location trends, spatial
//! hotspots and hourly/daily statistics, memoizing results per reading set.
//!
//! Module layout follows the Explicit Module Boundary Pattern (EMBP): each
//! module exposes a narrow surface re-exported here, and the binary only
//! talks to this gateway.

pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;

pub use analytics::{AnalysisSettings, AnalyticsService, TrendSelection};
pub use config::Config;
pub use error::{AnalyticsError, ApiError, RepositoryError, ValidationError};
pub use models::{AnalysisResult, Hotspot, Reading, StatBucket, TrendDirection, TrendResult};
pub use repository::{MemoryReadingRepository, PgReadingRepository, ReadingRepository};
pub use routes::{router, AppState};
