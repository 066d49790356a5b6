use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::ReadingRepository;
use crate::error::RepositoryError;
use crate::models::{Reading, ReadingRow};

// ---

/// Reads from the `moisture_readings` relation maintained by ingestion.
#[derive(Debug, Clone)]
pub struct PgReadingRepository {
    pool: PgPool,
}

impl PgReadingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReadingRepository for PgReadingRepository {
    async fn fetch_readings(
        &self,
        job_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        location: Option<&str>,
    ) -> Result<Vec<Reading>, RepositoryError> {
        // ---
        let rows: Vec<ReadingRow> = sqlx::query_as(
            r#"
            SELECT location, value, recorded_at, x, y, z
              FROM moisture_readings
             WHERE job_id = $1
               AND recorded_at >= $2
               AND recorded_at <= $3
               AND ($4::TEXT IS NULL OR location = $4)
             ORDER BY recorded_at ASC
            "#,
        )
        .bind(job_id)
        .bind(start)
        .bind(end)
        .bind(location)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!("Fetched {} readings for job {}", rows.len(), job_id);
        Ok(rows.into_iter().map(Reading::from).collect())
    }
}
