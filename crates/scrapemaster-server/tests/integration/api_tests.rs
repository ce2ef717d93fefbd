use std::time::Duration;

use axum::http::StatusCode;
use uuid::Uuid;

use scrapemaster_core::error::AppError;
use scrapemaster_core::identity::ProxyPool;
use scrapemaster_core::testutil::{MockExtractor, MockFetcher};
use scrapemaster_server::demo::DEMO_SITES;

use crate::integration::common::{
    create_job, delete, get, job_body, post, post_json, setup_test_app, setup_test_app_with,
    wait_for_status,
};

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_returns_banner() {
    let app = setup_test_app();

    let (status, json) = get(&app.router, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "ScrapeMaster API is running");
}

#[tokio::test]
async fn health_reports_jobs_and_connections() {
    let app = setup_test_app();
    create_job(&app.router, 1).await;

    let (status, json) = get(&app.router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["active_jobs"], 1);
    assert_eq!(json["active_connections"], 0);
    assert!(json["timestamp"].as_str().is_some());
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_job() {
    let app = setup_test_app();

    let (status, json) = post_json(&app.router, "/api/jobs", &job_body(3)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Job created successfully");
    assert_eq!(json["job"]["status"], "running");
    assert_eq!(json["job"]["target_items"], 30);
    assert_eq!(json["job"]["items_scraped"], 0);
    let job_id = json["job_id"].as_str().unwrap();

    let (status, json) = get(&app.router, &format!("/api/jobs/{job_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], job_id);
    assert_eq!(json["url"], "https://example.com/items");
    assert_eq!(json["selectors"]["container"], "div.item");
}

#[tokio::test]
async fn create_job_applies_defaults() {
    let app = setup_test_app();
    let body = serde_json::json!({
        "name": "Defaults",
        "url": "https://example.com",
        "selectors": {"title": "h1"}
    });

    let (status, json) = post_json(&app.router, "/api/jobs", &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["job"]["max_pages"], 10);
    assert_eq!(json["job"]["delay"], 1.0);
    assert_eq!(json["job"]["use_proxy"], true);

    let id: Uuid = json["job_id"].as_str().unwrap().parse().unwrap();
    app.state.orchestrator.delete_job(id).await.unwrap();
}

#[tokio::test]
async fn invalid_job_config_returns_400() {
    let app = setup_test_app();

    for body in [
        serde_json::json!({"name": "x", "url": "https://example.com", "selectors": {"t": "h1"}, "max_pages": 0}),
        serde_json::json!({"name": "x", "url": "https://example.com", "selectors": {"t": "h1"}, "delay": 1e30}),
        serde_json::json!({"name": "", "url": "https://example.com", "selectors": {"t": "h1"}}),
        serde_json::json!({"name": "x", "url": "ftp://example.com", "selectors": {"t": "h1"}}),
        serde_json::json!({"name": "x", "url": "https://example.com", "selectors": {"container": "div"}}),
    ] {
        let (status, json) = post_json(&app.router, "/api/jobs", &body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(json["error"], "validation_error");
    }

    let (_, json) = get(&app.router, "/api/jobs").await;
    assert_eq!(json["total"], 0);
}

#[tokio::test]
async fn two_records_on_one_page_complete_the_job() {
    let app = setup_test_app_with(
        MockFetcher::new(r#"<div class="item"><h1>A</h1></div><div class="item"><h1>B</h1></div>"#),
        MockExtractor::with_counts(vec![2]),
        ProxyPool::empty(),
    );

    let id = create_job(&app.router, 1).await;
    let job = wait_for_status(&app.router, &id, "completed").await;

    assert_eq!(job["items_scraped"], 2);
    assert_eq!(job["progress"], 100.0);
    assert_eq!(job["requests_per_min"], 0);
}

#[tokio::test]
async fn list_jobs_in_creation_order() {
    let app = setup_test_app();
    let first = create_job(&app.router, 1).await;
    let second = create_job(&app.router, 1).await;

    let (status, json) = get(&app.router, "/api/jobs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total"], 2);
    assert_eq!(json["jobs"][0]["id"], first.as_str());
    assert_eq!(json["jobs"][1]["id"], second.as_str());
}

#[tokio::test]
async fn unknown_job_returns_404() {
    let app = setup_test_app();
    let id = Uuid::new_v4();

    for (status, json) in [
        get(&app.router, &format!("/api/jobs/{id}")).await,
        delete(&app.router, &format!("/api/jobs/{id}")).await,
        post(&app.router, &format!("/api/jobs/{id}/start")).await,
        post(&app.router, &format!("/api/jobs/{id}/pause")).await,
    ] {
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }
}

#[tokio::test]
async fn malformed_job_id_returns_400() {
    let app = setup_test_app();

    let (status, _) = get(&app.router, "/api/jobs/not-a-uuid").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pause_then_start_restarts_job() {
    let app = setup_test_app_with(
        MockFetcher::new("<html></html>").with_latency(Duration::from_millis(20)),
        MockExtractor::with_counts(vec![1; 200]),
        ProxyPool::empty(),
    );
    let id = create_job(&app.router, 100).await;

    let (status, json) = post(&app.router, &format!("/api/jobs/{id}/pause")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Job paused");
    assert_eq!(json["job"]["status"], "paused");
    assert_eq!(json["job"]["requests_per_min"], 0);

    // Pausing again is a no-op.
    let (status, json) = post(&app.router, &format!("/api/jobs/{id}/pause")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["job"]["status"], "paused");

    let (status, json) = post(&app.router, &format!("/api/jobs/{id}/start")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Job started");
    assert_eq!(json["job"]["status"], "running");
    assert_eq!(json["job"]["progress"], 0.0);

    app.state.orchestrator.shutdown().await;
}

#[tokio::test]
async fn start_on_failed_job_returns_409() {
    let app = setup_test_app_with(
        MockFetcher::new("<html></html>"),
        MockExtractor::with_error(AppError::ExtractionError("broken selector".into())),
        ProxyPool::empty(),
    );
    let id = create_job(&app.router, 2).await;
    let job = wait_for_status(&app.router, &id, "error").await;
    assert!(job["error_message"].as_str().unwrap().contains("broken selector"));

    let (status, json) = post(&app.router, &format!("/api/jobs/{id}/start")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");

    let (_, job) = get(&app.router, &format!("/api/jobs/{id}")).await;
    assert_eq!(job["status"], "error");
}

#[tokio::test]
async fn pause_on_completed_job_returns_409() {
    let app = setup_test_app();
    let id = create_job(&app.router, 1).await;
    wait_for_status(&app.router, &id, "completed").await;

    let (status, _) = post(&app.router, &format!("/api/jobs/{id}/pause")).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post(&app.router, &format!("/api/jobs/{id}/start")).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn delete_removes_job() {
    let app = setup_test_app_with(
        MockFetcher::new("<html></html>").with_latency(Duration::from_millis(20)),
        MockExtractor::with_counts(vec![]),
        ProxyPool::empty(),
    );
    let id = create_job(&app.router, 50).await;

    let (status, json) = delete(&app.router, &format!("/api/jobs/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Job deleted");
    assert_eq!(app.state.orchestrator.active_workers().await, 0);

    let (status, _) = get(&app.router, &format!("/api/jobs/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn quick_start_creates_demo_job() {
    let app = setup_test_app();

    let (status, json) = post(&app.router, "/api/jobs/quick-start").await;

    assert_eq!(status, StatusCode::OK);
    let job = &json["job"];
    assert_eq!(job["max_pages"], 5);
    assert_eq!(job["use_proxy"], false);
    let name = job["name"].as_str().unwrap();
    assert!(DEMO_SITES.iter().any(|site| site.name == name), "{name}");

    app.state.orchestrator.shutdown().await;
}

// ---------------------------------------------------------------------------
// Proxies & analytics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn proxies_lists_pool() {
    let pool = ProxyPool::parse_list("10.0.0.1:3128@US, 10.0.0.2:8080@DE").unwrap();
    let app = setup_test_app_with(
        MockFetcher::new("<html></html>"),
        MockExtractor::with_counts(vec![]),
        pool,
    );

    let (status, json) = get(&app.router, "/api/proxies").await;

    assert_eq!(status, StatusCode::OK);
    let proxies = json["proxies"].as_array().unwrap();
    assert_eq!(proxies.len(), 2);
    assert_eq!(proxies[0]["ip"], "10.0.0.1");
    assert_eq!(proxies[0]["port"], 3128);
    assert_eq!(proxies[0]["country"], "US");
    assert_eq!(proxies[0]["status"], "active");
}

#[tokio::test]
async fn analytics_with_no_jobs() {
    let app = setup_test_app();

    let (status, json) = get(&app.router, "/api/analytics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success_rate"], 0.0);
    assert_eq!(json["total_jobs"], 0);
    assert_eq!(json["completed_jobs"], 0);
    assert_eq!(json["data_points"], 0);
    assert_eq!(json["active_sessions"], 0);
}

#[tokio::test]
async fn analytics_after_completed_job() {
    let app = setup_test_app();
    let id = create_job(&app.router, 2).await;
    wait_for_status(&app.router, &id, "completed").await;

    let (_, json) = get(&app.router, "/api/analytics").await;

    assert_eq!(json["success_rate"], 100.0);
    assert_eq!(json["total_jobs"], 1);
    assert_eq!(json["completed_jobs"], 1);
    assert_eq!(json["data_points"], 4);
    assert_eq!(json["total_requests"], 2);
}
