use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use chrono::Utc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use scrapemaster_core::job::JobConfig;
use scrapemaster_core::traits::{Extractor, Fetcher};

use crate::demo;
use crate::dto::{
    AnalyticsResponse, CreateJobRequest, CreateJobResponse, HealthResponse, JobActionResponse,
    JobListResponse, JobResponse, MessageResponse, ProxyListResponse, ProxyResponse, RootResponse,
};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use crate::ws::ws_handler;

type SharedState<F, E> = State<Arc<AppState<F, E>>>;

/// Build the full router with all routes.
pub fn router<F, E>(state: Arc<AppState<F, E>>) -> Router
where
    F: Fetcher,
    E: Extractor,
{
    let api = Router::new()
        .route("/api/jobs", get(list_jobs::<F, E>).post(create_job::<F, E>))
        .route("/api/jobs/quick-start", post(quick_start::<F, E>))
        .route(
            "/api/jobs/{id}",
            get(get_job::<F, E>).delete(delete_job::<F, E>),
        )
        .route("/api/jobs/{id}/start", post(start_job::<F, E>))
        .route("/api/jobs/{id}/pause", post(pause_job::<F, E>))
        .route("/api/proxies", get(list_proxies::<F, E>))
        .route("/api/analytics", get(analytics::<F, E>));

    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health::<F, E>))
        .route("/ws", get(ws_handler::<F, E>))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

async fn create_from_config<F, E>(
    state: &AppState<F, E>,
    config: JobConfig,
) -> Result<CreateJobResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let job = state.orchestrator.create_job(config).await?;
    Ok(CreateJobResponse {
        message: "Job created successfully".to_string(),
        job_id: job.id,
        job: job.into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobRequest,
    responses(
        (status = 200, description = "Job created and running", body = CreateJobResponse),
        (status = 400, description = "Invalid job configuration", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn create_job<F, E>(
    State(state): SharedState<F, E>,
    axum::Json(body): axum::Json<CreateJobRequest>,
) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let response = create_from_config(&state, body.into()).await?;
    Ok(axum::Json(response))
}

#[utoipa::path(
    post,
    path = "/api/jobs/quick-start",
    responses(
        (status = 200, description = "Demo job created and running", body = CreateJobResponse),
    ),
    tag = "jobs"
)]
pub async fn quick_start<F, E>(State(state): SharedState<F, E>) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let site = demo::random_site();
    tracing::info!(site = site.name, "Quick-start demo job");
    let response = create_from_config(&state, site.job_config()).await?;
    Ok(axum::Json(response))
}

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "All jobs in creation order", body = JobListResponse),
    ),
    tag = "jobs"
)]
pub async fn list_jobs<F, E>(State(state): SharedState<F, E>) -> impl IntoResponse
where
    F: Fetcher,
    E: Extractor,
{
    let jobs: Vec<JobResponse> = state
        .orchestrator
        .list_jobs()
        .into_iter()
        .map(JobResponse::from)
        .collect();
    let total = jobs.len();

    axum::Json(JobListResponse { jobs, total })
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job details", body = JobResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn get_job<F, E>(
    State(state): SharedState<F, E>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let job = state.orchestrator.get_job(id)?;
    Ok(axum::Json(JobResponse::from(job)))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job running", body = JobActionResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Job is completed or failed", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn start_job<F, E>(
    State(state): SharedState<F, E>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let job = state.orchestrator.start_job(id).await?;
    Ok(axum::Json(JobActionResponse {
        message: "Job started".to_string(),
        job: job.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/pause",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job paused", body = JobActionResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
        (status = 409, description = "Job is not running", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn pause_job<F, E>(
    State(state): SharedState<F, E>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    let job = state.orchestrator.pause_job(id).await?;
    Ok(axum::Json(JobActionResponse {
        message: "Job paused".to_string(),
        job: job.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job stopped and removed", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::dto::ErrorResponse),
    ),
    tag = "jobs"
)]
pub async fn delete_job<F, E>(
    State(state): SharedState<F, E>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError>
where
    F: Fetcher,
    E: Extractor,
{
    state.orchestrator.delete_job(id).await?;
    Ok(axum::Json(MessageResponse {
        message: "Job deleted".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Proxies & analytics
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/proxies",
    responses(
        (status = 200, description = "Proxy pool with health figures", body = ProxyListResponse),
    ),
    tag = "proxies"
)]
pub async fn list_proxies<F, E>(State(state): SharedState<F, E>) -> impl IntoResponse
where
    F: Fetcher,
    E: Extractor,
{
    let proxies = state
        .orchestrator
        .proxies()
        .snapshot()
        .into_iter()
        .map(ProxyResponse::from)
        .collect();

    axum::Json(ProxyListResponse { proxies })
}

#[utoipa::path(
    get,
    path = "/api/analytics",
    responses(
        (status = 200, description = "Aggregate job statistics", body = AnalyticsResponse),
    ),
    tag = "analytics"
)]
pub async fn analytics<F, E>(State(state): SharedState<F, E>) -> impl IntoResponse
where
    F: Fetcher,
    E: Extractor,
{
    axum::Json(AnalyticsResponse::from(state.orchestrator.analytics()))
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service banner", body = RootResponse),
    ),
    tag = "system"
)]
pub async fn root() -> impl IntoResponse {
    axum::Json(RootResponse {
        message: "ScrapeMaster API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health<F, E>(State(state): SharedState<F, E>) -> impl IntoResponse
where
    F: Fetcher,
    E: Extractor,
{
    axum::Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        active_jobs: state.orchestrator.list_jobs().len(),
        active_connections: state.connections.count(),
    })
}
