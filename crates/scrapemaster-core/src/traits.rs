use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::identity::ProxyServer;
use crate::models::{Record, Selectors};

/// One page fetch, with the identity chosen for it.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: String,
    pub user_agent: String,
    /// Route through this proxy instead of connecting directly.
    pub proxy: Option<ProxyServer>,
    pub timeout: Duration,
}

/// Raw HTTP outcome. Non-2xx statuses are returned, not raised; the worker
/// decides what to skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

impl PageResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one HTTP GET.
///
/// Transport failures (connect, timeout, unreadable body) are errors; any
/// response that arrived, whatever its status, is a `PageResponse`.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<PageResponse, AppError>> + Send;
}

/// Turns a page body into records using a job's selectors.
///
/// Extraction is synchronous: parsing and selection finish before the worker
/// reaches its next suspension point.
pub trait Extractor: Send + Sync + Clone + 'static {
    /// Extract at most `limit` records from `html`.
    fn extract(
        &self,
        html: &str,
        selectors: &Selectors,
        limit: usize,
    ) -> Result<Vec<Record>, AppError>;

    /// Check selector syntax before a job is created.
    fn validate(&self, selectors: &Selectors) -> Result<(), AppError> {
        let _ = selectors;
        Ok(())
    }
}
