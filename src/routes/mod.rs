//! HTTP routes gateway.
//!
//! Sibling modules each export a subrouter; this gateway merges them and
//! attaches the shared [`AppState`], so `main.rs` never sees individual
//! endpoints.

use std::sync::Arc;

use axum::Router;

use crate::analytics::AnalyticsService;
use crate::repository::ReadingRepository;

mod analytics;
mod health;
pub mod validate;

pub use analytics::{AnalyticsResponse, ResponseMetadata, ANALYTICS_PATH, MAX_BODY_BYTES};

// ---

/// Dependencies shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ReadingRepository>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppState {
    pub fn new(repository: Arc<dyn ReadingRepository>, analytics: Arc<AnalyticsService>) -> Self {
        Self {
            repository,
            analytics,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(analytics::router())
        .merge(health::router())
        .with_state(state)
}
