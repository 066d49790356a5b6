//! Error types for the analytics service.
//!
//! Validation and repository failures are terminal for a request and map
//! directly onto HTTP responses; insufficient trend data is internal to the
//! analytics core and only escapes through single-location trend calls.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// ---

/// Client input rejected by the request validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing request body")]
    MissingBody,
    #[error("Invalid content type. Expected application/json")]
    InvalidContentType,
    #[error("Invalid JSON in request body")]
    InvalidJson,
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("jobId cannot be empty")]
    EmptyJobId,
    #[error("Invalid jobId format")]
    InvalidJobIdFormat,
    #[error("jobId length must be between 1 and 50 characters")]
    JobIdLength,
    #[error("Invalid date format for {0}")]
    InvalidDate(&'static str),
    #[error("Invalid date range: startDate must be before or equal to endDate")]
    InvertedDateRange,
    #[error("Invalid location filter")]
    InvalidLocation,
    #[error("Failed to read request body")]
    UnreadableBody,
}

/// Any failure surfaced by the reading store, flattened to its message.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RepositoryError(pub String);

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("Insufficient data for {location}: {actual} readings, need at least {required}")]
    InsufficientData {
        location: String,
        required: usize,
        actual: usize,
    },
}

/// Errors returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed { allow: &'static str },
    #[error("Request body too large. Limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let body = Json(json!({ "error": self.to_string() }));
        let mut response = (self.status(), body).into_response();

        if let ApiError::MethodNotAllowed { allow } = self {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(allow));
        }
        response
    }
}
