use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use scrapemaster_core::config::EngineConfig;
use scrapemaster_core::identity::{IdentityPool, ProxyPool};
use scrapemaster_core::orchestrator::Orchestrator;
use scrapemaster_core::store::InMemoryJobStore;
use scrapemaster_core::testutil::{MockExtractor, MockFetcher};
use scrapemaster_server::routes;
use scrapemaster_server::state::AppState;

pub type TestState = Arc<AppState<MockFetcher, MockExtractor>>;

pub struct TestApp {
    pub router: Router,
    pub state: TestState,
}

/// App backed by mocks: every page returns two records.
pub fn setup_test_app() -> TestApp {
    setup_test_app_with(
        MockFetcher::new("<html></html>"),
        MockExtractor::with_counts(vec![2; 64]),
        ProxyPool::empty(),
    )
}

pub fn setup_test_app_with(
    fetcher: MockFetcher,
    extractor: MockExtractor,
    proxies: ProxyPool,
) -> TestApp {
    let engine = EngineConfig::default()
        .with_delay_jitter(Duration::ZERO)
        .with_fetch_timeout(Duration::from_secs(1));
    let orchestrator = Orchestrator::new(
        InMemoryJobStore::new(),
        fetcher,
        extractor,
        IdentityPool::with_proxies(proxies),
        engine,
    );
    let state = Arc::new(AppState::new(orchestrator));

    TestApp {
        router: routes::router(state.clone()),
        state,
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
    };
    (status, json)
}

pub async fn get(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

pub async fn post(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(router, Request::post(uri).body(Body::empty()).unwrap()).await
}

pub async fn delete(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(router, Request::delete(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(
    router: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(
        router,
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
    )
    .await
}

/// A fast job: no delay between pages, no proxy.
pub fn job_body(max_pages: u32) -> serde_json::Value {
    serde_json::json!({
        "name": "Items",
        "url": "https://example.com/items",
        "selectors": {"container": "div.item", "title": "h1"},
        "max_pages": max_pages,
        "delay": 0.0,
        "use_proxy": false
    })
}

/// Create a job and return its id.
pub async fn create_job(router: &Router, max_pages: u32) -> String {
    let (status, json) = post_json(router, "/api/jobs", &job_body(max_pages)).await;
    assert_eq!(status, StatusCode::OK, "{json}");
    json["job_id"].as_str().unwrap().to_string()
}

/// Poll `GET /api/jobs/{id}` until the job reaches `status`.
pub async fn wait_for_status(router: &Router, id: &str, status: &str) -> serde_json::Value {
    for _ in 0..400 {
        let (_, job) = get(router, &format!("/api/jobs/{id}")).await;
        if job["status"] == status {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("job {id} never reached {status}");
}
