use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scrapemaster_core::analytics::Analytics;
use scrapemaster_core::identity::{ProxyServer, ProxyStatus};
use scrapemaster_core::job::{Job, JobConfig};

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

fn default_max_pages() -> u32 {
    10
}

fn default_delay() -> f64 {
    1.0
}

fn default_use_proxy() -> bool {
    true
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateJobRequest {
    pub name: String,
    pub url: String,
    /// Field name → CSS selector. The `container` key selects record elements.
    pub selectors: BTreeMap<String, String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Minimum seconds between pages
    #[serde(default = "default_delay")]
    pub delay: f64,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

impl From<CreateJobRequest> for JobConfig {
    fn from(req: CreateJobRequest) -> Self {
        JobConfig::new(req.name, req.url, req.selectors.into())
            .with_max_pages(req.max_pages)
            .with_delay(req.delay)
            .with_proxy(req.use_proxy)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobResponse {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub selectors: BTreeMap<String, String>,
    pub max_pages: u32,
    pub delay: f64,
    pub use_proxy: bool,
    pub status: String,
    pub progress: f64,
    pub items_scraped: u64,
    pub target_items: u64,
    pub requests_per_min: u32,
    pub total_requests: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            name: job.name,
            url: job.url,
            selectors: job.selectors.into_inner(),
            max_pages: job.max_pages,
            delay: job.delay,
            use_proxy: job.use_proxy,
            status: job.status.to_string(),
            progress: job.progress,
            items_scraped: job.items_scraped,
            target_items: job.target_items,
            requests_per_min: job.requests_per_min,
            total_requests: job.total_requests,
            error_message: job.error_message,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct CreateJobResponse {
    pub message: String,
    pub job_id: Uuid,
    pub job: JobResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobActionResponse {
    pub message: String,
    pub job: JobResponse,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Proxies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProxyResponse {
    pub id: String,
    pub ip: String,
    pub port: u16,
    pub country: String,
    pub status: String,
    /// Smoothed response time in milliseconds
    pub response_time: u32,
    pub success_rate: f64,
}

impl From<ProxyServer> for ProxyResponse {
    fn from(proxy: ProxyServer) -> Self {
        Self {
            id: proxy.id,
            ip: proxy.ip,
            port: proxy.port,
            country: proxy.country,
            status: match proxy.status {
                ProxyStatus::Active => "active",
                ProxyStatus::Error => "error",
            }
            .to_string(),
            response_time: proxy.response_time,
            success_rate: proxy.success_rate,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ProxyListResponse {
    pub proxies: Vec<ProxyResponse>,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AnalyticsResponse {
    pub success_rate: f64,
    pub total_requests: u64,
    pub data_points: u64,
    pub active_sessions: usize,
    pub total_jobs: usize,
    pub completed_jobs: usize,
}

impl From<Analytics> for AnalyticsResponse {
    fn from(a: Analytics) -> Self {
        Self {
            success_rate: a.success_rate,
            total_requests: a.total_requests,
            data_points: a.data_points,
            active_sessions: a.active_sessions,
            total_jobs: a.total_jobs,
            completed_jobs: a.completed_jobs,
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub active_jobs: usize,
    pub active_connections: usize,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
