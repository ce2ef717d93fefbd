use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::events::DEFAULT_EVENT_CAPACITY;

/// Tunables shared by every worker.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Random time added on top of each job's `delay` before a fetch.
    pub delay_jitter: Duration,
    /// Per-fetch timeout. A timeout skips the page, never the job.
    pub fetch_timeout: Duration,
    /// Records kept per page; extra containers are ignored.
    pub items_per_page: usize,
    /// Query parameter carrying the page number from page 2 on.
    pub page_param: String,
    /// Events buffered per live subscriber before it starts losing them.
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            delay_jitter: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(10),
            items_per_page: 10,
            page_param: "page".to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Read configuration from environment variables.
    ///
    /// - `SCRAPEMASTER_DELAY_JITTER_MS` (default 2000)
    /// - `SCRAPEMASTER_FETCH_TIMEOUT_SECS` (default 10, at least 1)
    /// - `SCRAPEMASTER_ITEMS_PER_PAGE` (default 10, at least 1)
    /// - `SCRAPEMASTER_PAGE_PARAM` (default `page`)
    /// - `SCRAPEMASTER_EVENT_CAPACITY` (default 1024, at least 1)
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let jitter_ms: u64 = env_or("SCRAPEMASTER_DELAY_JITTER_MS", 2000)?;
        let timeout_secs: u64 = env_or("SCRAPEMASTER_FETCH_TIMEOUT_SECS", 10)?;
        let items_per_page: usize = env_or("SCRAPEMASTER_ITEMS_PER_PAGE", 10)?;
        let event_capacity: usize =
            env_or("SCRAPEMASTER_EVENT_CAPACITY", defaults.event_capacity)?;
        let page_param = std::env::var("SCRAPEMASTER_PAGE_PARAM")
            .ok()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.page_param);

        if timeout_secs == 0 {
            return Err(AppError::ConfigError(
                "SCRAPEMASTER_FETCH_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        if items_per_page == 0 {
            return Err(AppError::ConfigError(
                "SCRAPEMASTER_ITEMS_PER_PAGE must be at least 1".into(),
            ));
        }
        if event_capacity == 0 {
            return Err(AppError::ConfigError(
                "SCRAPEMASTER_EVENT_CAPACITY must be at least 1".into(),
            ));
        }

        Ok(Self {
            delay_jitter: Duration::from_millis(jitter_ms),
            fetch_timeout: Duration::from_secs(timeout_secs),
            items_per_page,
            page_param,
            event_capacity,
        })
    }

    pub fn with_delay_jitter(mut self, jitter: Duration) -> Self {
        self.delay_jitter = jitter;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_items_per_page(mut self, items: usize) -> Self {
        self.items_per_page = items;
        self
    }
}

/// Parse an optional environment variable, falling back to `default` when unset.
pub fn env_or<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!("Invalid {key} '{raw}': could not parse value"))
        }),
    }
}
