//! Request validation for the analytics endpoint.
//!
//! Checks run in a fixed order and the first failure ends the request;
//! nothing downstream (storage, compute) is touched until every check passes.

use axum::http::{header, HeaderMap, Method};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Map, Value};

use crate::error::{ApiError, ValidationError};

/// The only verb the analytics endpoint accepts, as advertised in `Allow`.
pub const ACCEPTED_METHOD: &str = "POST";

pub const MAX_JOB_ID_LEN: usize = 50;

// ---

/// A request that passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsQuery {
    pub job_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
}

/// Which end of an inclusive window a date-only value describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

pub fn validate_request(
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AnalyticsQuery, ApiError> {
    // ---
    check_method(method)?;

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::MissingBody.into());
    }

    if !is_json_content_type(headers) {
        return Err(ValidationError::InvalidContentType.into());
    }

    let params = match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        _ => return Err(ValidationError::InvalidJson.into()),
    };

    let job_id = validate_job_id(&params)?;
    let (start, end) = validate_date_range(&params)?;
    let location = validate_location(&params)?;

    Ok(AnalyticsQuery {
        job_id,
        start,
        end,
        location,
    })
}

/// First check of the chain; also used before the body has been read.
pub fn check_method(method: &Method) -> Result<(), ApiError> {
    if *method != Method::POST {
        return Err(ApiError::MethodNotAllowed {
            allow: ACCEPTED_METHOD,
        });
    }
    Ok(())
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn validate_job_id(params: &Map<String, Value>) -> Result<String, ValidationError> {
    // ---
    let job_id = match params.get("jobId") {
        None | Some(Value::Null) => return Err(ValidationError::MissingParameter("jobId")),
        Some(Value::String(s)) => s,
        Some(_) => return Err(ValidationError::InvalidJobIdFormat),
    };

    if job_id.is_empty() {
        return Err(ValidationError::EmptyJobId);
    }
    if !job_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidJobIdFormat);
    }
    if job_id.len() > MAX_JOB_ID_LEN {
        return Err(ValidationError::JobIdLength);
    }
    Ok(job_id.clone())
}

fn validate_date_range(
    params: &Map<String, Value>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
    // ---
    let raw_start = required_str(params, "startDate")?;
    let raw_end = required_str(params, "endDate")?;

    let start =
        parse_timestamp(raw_start, Bound::Start).ok_or(ValidationError::InvalidDate("startDate"))?;
    let end = parse_timestamp(raw_end, Bound::End).ok_or(ValidationError::InvalidDate("endDate"))?;

    if start > end {
        return Err(ValidationError::InvertedDateRange);
    }
    Ok((start, end))
}

fn required_str<'a>(
    params: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, ValidationError> {
    match params.get(name) {
        None | Some(Value::Null) => Err(ValidationError::MissingParameter(name)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ValidationError::InvalidDate(name)),
    }
}

fn validate_location(params: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    match params.get("location") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(_) => Err(ValidationError::InvalidLocation),
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts RFC 3339 with an offset, a date-time without offset (taken as
/// UTC), or a bare date. A bare date covers the whole day: its first instant
/// for [`Bound::Start`], its last for [`Bound::End`].
pub fn parse_timestamp(raw: &str, bound: Bound) -> Option<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    match bound {
        Bound::Start => Some(date.and_time(NaiveTime::MIN).and_utc()),
        Bound::End => date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .map(|d| d.and_utc()),
    }
}
