use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::Selectors;

/// Upper bound on `max_pages` accepted at creation.
pub const MAX_PAGES_LIMIT: u32 = 1000;

/// Upper bound on the per-page `delay`, in seconds (one hour).
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Status of a scrape job.
///
/// ```text
/// created --(spawn worker)--> running
/// running --(pause)---------> paused
/// running --(pages done)----> completed
/// running --(failure)-------> error
/// paused  --(start)---------> running   (restarts from page 1)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Created,
    Running,
    Paused,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    /// Whether `self -> next` is an edge of the job state machine.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Created, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Paused)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Error)
                | (JobStatus::Paused, JobStatus::Running)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(JobStatus::Created),
            "running" => Ok(JobStatus::Running),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "error" => Ok(JobStatus::Error),
            _ => Err(format!("Unknown job status: {}", s)),
        }
    }
}

/// Request to create a new scrape job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub name: String,
    pub url: String,
    pub selectors: Selectors,
    pub max_pages: u32,
    /// Minimum pause between pages, in seconds.
    pub delay: f64,
    pub use_proxy: bool,
}

impl JobConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, selectors: Selectors) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            selectors,
            max_pages: 10,
            delay: 1.0,
            use_proxy: true,
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    /// Reject configurations no worker could run.
    ///
    /// Selector syntax is checked separately by the extractor, since only it
    /// knows its selector language.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::ValidationError("name must not be empty".into()));
        }

        let parsed = Url::parse(&self.url)
            .map_err(|e| AppError::ValidationError(format!("invalid url '{}': {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::ValidationError(format!(
                "url scheme '{}' is not allowed (only http/https)",
                parsed.scheme()
            )));
        }

        if self.max_pages == 0 || self.max_pages > MAX_PAGES_LIMIT {
            return Err(AppError::ValidationError(format!(
                "max_pages must be between 1 and {MAX_PAGES_LIMIT}, got {}",
                self.max_pages
            )));
        }

        if !(0.0..=MAX_DELAY_SECS).contains(&self.delay) {
            return Err(AppError::ValidationError(format!(
                "delay must be between 0 and {MAX_DELAY_SECS} seconds, got {}",
                self.delay
            )));
        }

        if self.selectors.field_count() == 0 {
            return Err(AppError::ValidationError(
                "selectors must name at least one field besides 'container'".into(),
            ));
        }

        Ok(())
    }
}

/// A scrape job: immutable configuration plus mutable run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub selectors: Selectors,
    pub max_pages: u32,
    pub delay: f64,
    pub use_proxy: bool,
    pub status: JobStatus,
    /// Percentage in `[0, 100]`; 100 only once the job is completed.
    pub progress: f64,
    /// Records emitted over the job's whole lifetime, across restarts.
    pub items_scraped: u64,
    /// Upper bound on records: `max_pages` times the per-page cap.
    pub target_items: u64,
    pub requests_per_min: u32,
    /// Fetch attempts over the job's whole lifetime.
    pub total_requests: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh job in `created` from a validated config.
    pub fn new(config: JobConfig, items_per_page: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            target_items: u64::from(config.max_pages) * items_per_page as u64,
            name: config.name,
            url: config.url,
            selectors: config.selectors,
            max_pages: config.max_pages,
            delay: config.delay,
            use_proxy: config.use_proxy,
            status: JobStatus::Created,
            progress: 0.0,
            items_scraped: 0,
            requests_per_min: 0,
            total_requests: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobStatus::Running
    }

    /// Move along a state machine edge, or fail with `Conflict`.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::Conflict(format!(
                "Job {} cannot go from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Progress recorded at the checkpoint of `page` (1-indexed).
///
/// Counts pages already finished, so a running job never reports 100;
/// only completion sets it.
pub fn page_progress(page: u32, max_pages: u32) -> f64 {
    if max_pages == 0 {
        return 0.0;
    }
    f64::from(page.saturating_sub(1).min(max_pages)) / f64::from(max_pages) * 100.0
}
