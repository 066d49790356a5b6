//! Read-side access to persisted moisture readings.
//!
//! The analytics core only needs a time-window query; any failure underneath
//! is surfaced as a single [`RepositoryError`] and never retried here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::RepositoryError;
use crate::models::Reading;

mod memory;
mod postgres;

pub use memory::MemoryReadingRepository;
pub use postgres::PgReadingRepository;

// ---

#[async_trait]
pub trait ReadingRepository: Send + Sync {
    /// Readings for `job_id` with `start <= timestamp <= end`, ascending by
    /// timestamp, optionally restricted to one location.
    async fn fetch_readings(
        &self,
        job_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        location: Option<&str>,
    ) -> Result<Vec<Reading>, RepositoryError>;
}
