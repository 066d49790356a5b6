use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{HeaderMap, Method, StatusCode},
    routing::any,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use super::validate::{check_method, validate_request, AnalyticsQuery};
use super::AppState;
use crate::error::{ApiError, ValidationError};
use crate::models::{Hotspot, Statistics, Trends};

/// Path of the moisture analytics endpoint.
pub const ANALYTICS_PATH: &str = "/api/moisture/analytics";

/// Largest accepted request body; the JSON query is a few hundred bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// ---

pub fn router() -> Router<AppState> {
    // ---
    // `any` so that wrong verbs reach the validator and get a JSON 405
    Router::new()
        .route(ANALYTICS_PATH, any(handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub trends: Trends,
    pub hotspots: Vec<Hotspot>,
    pub statistics: Statistics,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub job_id: String,
    pub reading_count: usize,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub analyzed_at: DateTime<Utc>,
    pub cached: bool,
    pub request_id: Uuid,
}

async fn handler(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    // ---
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analytics", %request_id);
    run(state, method, headers, body, request_id)
        .instrument(span)
        .await
}

async fn run(
    state: AppState,
    method: Method,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
    request_id: Uuid,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    // ---
    info!("{} {} - Starting analysis", method, ANALYTICS_PATH);

    // Step 1: Validate before touching storage
    let body = body
        .map_err(|rejection| {
            check_method(&method).err().unwrap_or_else(|| body_error(&rejection))
        })
        .inspect_err(|e| warn!("Rejected request: {}", e))?;
    let query = validate_request(&method, &headers, &body).inspect_err(|e| {
        warn!("Rejected request: {}", e);
    })?;
    let AnalyticsQuery {
        job_id,
        start,
        end,
        location,
    } = query;

    // Step 2: Fetch readings
    debug!("Fetching readings for job {} in [{}, {}]", job_id, start, end);
    let readings = state
        .repository
        .fetch_readings(&job_id, start, end, location.as_deref())
        .await
        .inspect_err(|e| error!("Failed to fetch readings for job {}: {}", job_id, e))?;

    // Step 3: Analyze (memoized)
    let analysis = state.analytics.analyze(&readings);
    let result = analysis.result;

    info!(
        "Analysis complete for job {}: {} readings, {} hotspots, cached={}",
        job_id,
        result.reading_count,
        result.hotspots.len(),
        analysis.cached
    );

    Ok(Json(AnalyticsResponse {
        trends: result.trends.clone(),
        hotspots: result.hotspots.clone(),
        statistics: result.statistics.clone(),
        metadata: ResponseMetadata {
            job_id,
            reading_count: result.reading_count,
            start_date: start,
            end_date: end,
            location,
            analyzed_at: result.timestamp,
            cached: analysis.cached,
            request_id,
        },
    }))
}

/// Map axum's body rejection onto the JSON error envelope.
fn body_error(rejection: &BytesRejection) -> ApiError {
    debug!("Body rejected: {}", rejection.body_text());
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge {
            limit: MAX_BODY_BYTES,
        }
    } else {
        ValidationError::UnreadableBody.into()
    }
}
