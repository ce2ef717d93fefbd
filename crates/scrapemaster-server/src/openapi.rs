use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ScrapeMaster API",
        version = "0.1.0",
        description = "Concurrent CSS-selector scraping jobs with a live WebSocket feed at /ws."
    ),
    paths(
        crate::routes::create_job,
        crate::routes::quick_start,
        crate::routes::list_jobs,
        crate::routes::get_job,
        crate::routes::start_job,
        crate::routes::pause_job,
        crate::routes::delete_job,
        crate::routes::list_proxies,
        crate::routes::analytics,
        crate::routes::root,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::CreateJobRequest,
        crate::dto::CreateJobResponse,
        crate::dto::JobResponse,
        crate::dto::JobActionResponse,
        crate::dto::JobListResponse,
        crate::dto::ProxyResponse,
        crate::dto::ProxyListResponse,
        crate::dto::AnalyticsResponse,
        crate::dto::RootResponse,
        crate::dto::HealthResponse,
        crate::dto::MessageResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "jobs", description = "Scrape job lifecycle"),
        (name = "proxies", description = "Outbound proxy pool"),
        (name = "analytics", description = "Aggregate statistics"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
