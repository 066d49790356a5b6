use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use moisture_analytics::routes::MAX_BODY_BYTES;
use moisture_analytics::{
    router, AnalysisSettings, AnalyticsService, AppState, MemoryReadingRepository, Reading,
};

const PATH: &str = "/api/moisture/analytics";

fn at(h: i64, m: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap() + Duration::hours(h) + Duration::minutes(m)
}

/// Kitchen drying out over three hours, plus a wet spot in the bathroom.
fn seeded_repository() -> MemoryReadingRepository {
    let repo = MemoryReadingRepository::new();
    repo.extend(
        "job-123",
        [
            Reading::new("Kitchen", 18.0, at(0, 0)),
            Reading::new("Kitchen", 16.0, at(1, 0)),
            Reading::new("Kitchen", 15.0, at(2, 0)),
            Reading::new("Bath", 22.0, at(0, 10)).at(0.0, 0.0),
            Reading::new("Bath", 25.0, at(0, 20)).at(0.5, 0.0),
        ],
    );
    repo
}

/// Serve the router on an ephemeral port and return its base URL.
async fn spawn_app(repo: Arc<MemoryReadingRepository>) -> Result<String> {
    // ---
    let analytics = Arc::new(AnalyticsService::new(AnalysisSettings::default()));
    let app = router(AppState::new(repo, analytics));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(format!("http://{}", addr))
}

fn request_body(job_id: &str) -> Value {
    json!({
        "jobId": job_id,
        "startDate": "2024-01-15T00:00:00Z",
        "endDate": "2024-01-15T23:59:59Z",
    })
}

async fn post(base: &str, body: &Value) -> Result<(StatusCode, Value)> {
    let response = Client::new()
        .post(format!("{}{}", base, PATH))
        .json(body)
        .send()
        .await?;
    let status = response.status();
    Ok((status, response.json().await?))
}

#[tokio::test]
async fn analytics_endpoint_returns_full_result() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let (status, body) = post(&base, &request_body("job-123")).await?;
    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);

    assert_eq!(body["metadata"]["jobId"], "job-123");
    assert_eq!(body["metadata"]["readingCount"], 5);
    assert_eq!(body["metadata"]["cached"], false);

    let overall = &body["trends"]["overall"];
    assert_eq!(overall["location"], "Kitchen");
    assert_eq!(overall["trend"], "decreasing");
    assert!(overall["confidence"].as_f64().unwrap() > 0.0);
    assert_eq!(body["trends"]["insufficientData"], json!(["Bath"]));

    let hotspots = body["hotspots"].as_array().unwrap();
    assert_eq!(hotspots.len(), 1);
    assert_eq!(hotspots[0]["maxValue"], 25.0);

    // Bath and Kitchen both read during the 08:00 hour
    let hourly = body["statistics"]["hourly"].as_array().unwrap();
    assert!(hourly.len() > 1);
    assert_eq!(repo.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn repeated_request_is_served_from_cache() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let (_, first) = post(&base, &request_body("job-123")).await?;
    let (_, second) = post(&base, &request_body("job-123")).await?;

    assert_eq!(second["metadata"]["cached"], true);
    assert_eq!(first["trends"], second["trends"]);
    assert_eq!(first["hotspots"], second["hotspots"]);
    assert_eq!(first["statistics"], second["statistics"]);
    assert_eq!(first["metadata"]["analyzedAt"], second["metadata"]["analyzedAt"]);
    assert_ne!(first["metadata"]["requestId"], second["metadata"]["requestId"]);

    // the store is still consulted every time; only the analysis is memoized
    assert_eq!(repo.calls(), 2);

    Ok(())
}

#[tokio::test]
async fn empty_window_yields_empty_result() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(seeded_repository())).await?;

    let (status, body) = post(&base, &request_body("job-without-readings")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["readingCount"], 0);
    assert_eq!(body["statistics"]["hourly"], json!([]));
    assert_eq!(body["statistics"]["daily"], json!([]));
    assert_eq!(body["hotspots"], json!([]));
    assert_eq!(body["trends"]["overall"], Value::Null);

    Ok(())
}

#[tokio::test]
async fn location_filter_restricts_readings() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(seeded_repository())).await?;

    let mut body = request_body("job-123");
    body["location"] = json!("Kitchen");
    let (status, body) = post(&base, &body).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["readingCount"], 3);
    assert_eq!(body["metadata"]["location"], "Kitchen");
    assert_eq!(body["hotspots"], json!([]));

    Ok(())
}

#[tokio::test]
async fn wrong_methods_are_rejected_with_allow_header() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(seeded_repository())).await?;
    let client = Client::new();
    let url = format!("{}{}", base, PATH);

    for method in [
        reqwest::Method::GET,
        reqwest::Method::PUT,
        reqwest::Method::PATCH,
        reqwest::Method::DELETE,
    ] {
        let response = client
            .request(method.clone(), &url)
            .json(&request_body("job-123"))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{}", method);
        assert_eq!(response.headers()["allow"], "POST");
        let body: Value = response.json().await?;
        assert_eq!(body["error"], "Method not allowed");
    }

    Ok(())
}

#[tokio::test]
async fn job_id_validation_messages() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let cases = [
        (
            json!({ "startDate": "2024-01-15", "endDate": "2024-01-15" }),
            "Missing required parameter: jobId",
        ),
        (request_body(""), "jobId cannot be empty"),
        (request_body("job#123"), "Invalid jobId format"),
        (
            request_body(&"a".repeat(51)),
            "jobId length must be between 1 and 50 characters",
        ),
    ];

    for (body, expected) in cases {
        let (status, response) = post(&base, &body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], expected);
    }
    assert_eq!(repo.calls(), 0);

    let (status, _) = post(&base, &request_body(&"a".repeat(50))).await?;
    assert_eq!(status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn inverted_date_range_never_reaches_repository() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let body = json!({
        "jobId": "job-123",
        "startDate": "2024-01-16T00:00:00Z",
        "endDate": "2024-01-15T00:00:00Z",
    });
    let (status, response) = post(&base, &body).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response["error"],
        "Invalid date range: startDate must be before or equal to endDate"
    );
    assert_eq!(repo.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn body_and_content_type_checks() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(seeded_repository())).await?;
    let client = Client::new();
    let url = format!("{}{}", base, PATH);

    let response = client.post(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Missing request body");

    let response = client
        .post(&url)
        .header("content-type", "text/plain")
        .body(request_body("job-123").to_string())
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await?;
    assert_eq!(body["error"], "Invalid content type. Expected application/json");

    Ok(())
}

/// A valid query padded past the body limit with an ignored field.
fn oversized_body() -> String {
    let mut body = request_body("job-123");
    body["notes"] = json!("x".repeat(MAX_BODY_BYTES + 1024));
    body.to_string()
}

#[tokio::test]
async fn oversized_body_gets_json_413() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let response = Client::new()
        .post(format!("{}{}", base, PATH))
        .header("content-type", "application/json")
        .body(oversized_body())
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = response.json().await?;
    assert_eq!(
        body["error"],
        format!("Request body too large. Limit is {} bytes", MAX_BODY_BYTES)
    );
    assert_eq!(repo.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn oversized_body_with_wrong_method_is_still_405() -> Result<()> {
    // ---
    let base = spawn_app(Arc::new(seeded_repository())).await?;

    let response = Client::new()
        .put(format!("{}{}", base, PATH))
        .header("content-type", "application/json")
        .body(oversized_body())
        .send()
        .await?;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "POST");

    Ok(())
}

#[tokio::test]
async fn storage_failure_maps_to_500() -> Result<()> {
    // ---
    let repo = Arc::new(MemoryReadingRepository::failing("connection refused"));
    let base = spawn_app(repo.clone()).await?;

    let (status, body) = post(&base, &request_body("job-123")).await?;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Database error: connection refused");
    assert_eq!(repo.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn health_endpoint_reports_ok() -> Result<()> {
    // ---
    let repo = Arc::new(seeded_repository());
    let base = spawn_app(repo.clone()).await?;

    let body: Value = Client::new()
        .get(format!("{}/health", base))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["cachedAnalyses"], 0);
    assert_eq!(repo.calls(), 0);

    Ok(())
}
