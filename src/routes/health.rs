// src/routes/health.rs
//! Liveness endpoint for the moisture analytics service.
//!
//! Used by container orchestrators and CI to check the service answers HTTP.
//! Follows the same boundary as the other route modules: the handler stays
//! private, the gateway (`mod.rs`) only sees [`router`].

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;

/// JSON response body for the `/health` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    cached_analyses: usize,
}

/// Handle `GET /health`.
///
/// Reports the number of memoized analyses; never reaches the reading store.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cached_analyses: state.analytics.cache().len(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
