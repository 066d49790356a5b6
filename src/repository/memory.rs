use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::ReadingRepository;
use crate::error::RepositoryError;
use crate::models::Reading;

// ---

/// In-process reading store for tests and local runs.
///
/// Counts every fetch so callers can assert the store was never reached, and
/// can be switched into a failing mode to exercise storage errors.
#[derive(Debug, Default)]
pub struct MemoryReadingRepository {
    readings: RwLock<Vec<(String, Reading)>>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MemoryReadingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose every fetch fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn insert(&self, job_id: impl Into<String>, reading: Reading) {
        self.readings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((job_id.into(), reading));
    }

    pub fn extend(&self, job_id: &str, readings: impl IntoIterator<Item = Reading>) {
        for reading in readings {
            self.insert(job_id, reading);
        }
    }

    /// Number of `fetch_readings` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadingRepository for MemoryReadingRepository {
    async fn fetch_readings(
        &self,
        job_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        location: Option<&str>,
    ) -> Result<Vec<Reading>, RepositoryError> {
        // ---
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(RepositoryError(message.clone()));
        }

        let mut found: Vec<Reading> = self
            .readings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(job, r)| {
                job == job_id
                    && r.timestamp >= start
                    && r.timestamp <= end
                    && location.map_or(true, |loc| r.location == loc)
            })
            .map(|(_, r)| r.clone())
            .collect();
        found.sort_by_key(|r| r.timestamp);
        Ok(found)
    }
}
