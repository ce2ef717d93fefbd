//! Test utilities: mock implementations of the fetch and extract traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{Record, Selectors};
use crate::traits::{Extractor, Fetcher, PageRequest, PageResponse};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns queued responses, then a default body.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the front element.
    responses: Arc<Mutex<VecDeque<Result<PageResponse, AppError>>>>,
    /// Returned with status 200 once the queue is empty.
    default_body: Arc<String>,
    latency: Duration,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<PageRequest>>>,
}

impl MockFetcher {
    /// Every fetch succeeds with `html`.
    pub fn new(html: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            default_body: Arc::new(html.to_string()),
            latency: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The first fetch fails with `error`; later ones succeed with an empty page.
    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<PageResponse, AppError>>) -> Self {
        let fetcher = Self::new("<html><body></body></html>");
        *fetcher.responses.lock().unwrap() = responses.into();
        fetcher
    }

    /// Sleep this long inside every fetch.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(PageResponse::ok(self.default_body.as_str())))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

enum Scripted {
    Records(usize),
    Fail(AppError),
    Panic,
}

/// Mock extractor that returns a scripted number of records per call.
///
/// Once the script runs out every call returns no records.
#[derive(Clone)]
pub struct MockExtractor {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<AtomicUsize>,
}

impl MockExtractor {
    /// Call `n` returns `counts[n]` records.
    pub fn with_counts(counts: Vec<usize>) -> Self {
        Self::scripted(counts.into_iter().map(Scripted::Records).collect())
    }

    /// The first call fails with `error`.
    pub fn with_error(error: AppError) -> Self {
        Self::scripted(vec![Scripted::Fail(error)])
    }

    /// The first call panics.
    pub fn panicking() -> Self {
        Self::scripted(vec![Scripted::Panic])
    }

    fn scripted(script: Vec<Scripted>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Extractor for MockExtractor {
    fn extract(
        &self,
        _html: &str,
        selectors: &Selectors,
        limit: usize,
    ) -> Result<Vec<Record>, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        match next {
            None => Ok(Vec::new()),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Panic) => panic!("extractor blew up"),
            Some(Scripted::Records(n)) => Ok((0..n.min(limit))
                .map(|i| {
                    selectors
                        .fields()
                        .map(|(field, _)| (field.to_string(), Some(format!("{field} {call}.{i}"))))
                        .collect()
                })
                .collect()),
        }
    }
}
