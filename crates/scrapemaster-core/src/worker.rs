use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::AppError;
use crate::events::{Event, EventBroadcaster, LogLevel};
use crate::identity::IdentityPool;
use crate::job::{Job, JobStatus, page_progress};
use crate::pacing::PageDelay;
use crate::store::JobStore;
use crate::traits::{Extractor, Fetcher, PageRequest};

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        job_id: Uuid,
        max_pages: u32,
    },
    PageScraped {
        job_id: Uuid,
        page: u32,
        items: usize,
    },
    PageSkipped {
        job_id: Uuid,
        page: u32,
        url: &'a str,
        error: &'a AppError,
    },
    Stopped {
        job_id: Uuid,
        page: u32,
    },
    Completed {
        job_id: Uuid,
        total_items: u64,
    },
    Failed {
        job_id: Uuid,
        error: &'a str,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { job_id, max_pages } => {
                tracing::info!(%job_id, %max_pages, "Worker started");
            }
            WorkerEvent::PageScraped {
                job_id,
                page,
                items,
            } => {
                tracing::debug!(%job_id, %page, %items, "Page scraped");
            }
            WorkerEvent::PageSkipped {
                job_id,
                page,
                url,
                error,
            } => {
                tracing::warn!(%job_id, %page, %url, %error, "Page skipped");
            }
            WorkerEvent::Stopped { job_id, page } => {
                tracing::info!(%job_id, %page, "Worker stopped before finishing");
            }
            WorkerEvent::Completed {
                job_id,
                total_items,
            } => {
                tracing::info!(%job_id, %total_items, "Job completed");
            }
            WorkerEvent::Failed { job_id, error } => {
                tracing::error!(%job_id, %error, "Job failed");
            }
        }
    }
}

/// How a worker run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every page was visited and the job is now `completed`.
    Completed,
    /// The job left `running`, was deleted, or the run was cancelled.
    Stopped,
    /// An unabsorbed failure put the job in `error`.
    Failed,
}

/// Drives one job through its page range.
///
/// The store is re-read at the top of every page; the worker fetches only
/// while the job is `running` and stops quietly as soon as it is not. Its
/// cancellation token is also raced against the delay and the fetch, so a
/// cancelled worker exits at its next suspension point.
pub struct ScrapeWorker<S, F, E>
where
    S: JobStore,
    F: Fetcher,
    E: Extractor,
{
    job_id: Uuid,
    store: S,
    fetcher: F,
    extractor: E,
    broadcaster: EventBroadcaster,
    identities: IdentityPool,
    config: Arc<EngineConfig>,
}

impl<S, F, E> ScrapeWorker<S, F, E>
where
    S: JobStore,
    F: Fetcher,
    E: Extractor,
{
    pub fn new(
        job_id: Uuid,
        store: S,
        fetcher: F,
        extractor: E,
        broadcaster: EventBroadcaster,
        identities: IdentityPool,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            job_id,
            store,
            fetcher,
            extractor,
            broadcaster,
            identities,
            config,
        }
    }

    /// Run to completion, absorbing every failure.
    ///
    /// Errors and panics inside the page loop put the job in `error`; nothing
    /// escapes to the caller.
    pub async fn drive<WR: WorkerReporter>(
        self,
        cancel: CancellationToken,
        reporter: WR,
    ) -> RunOutcome {
        let result = AssertUnwindSafe(self.run(&cancel, &reporter))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(e)) => e.to_string(),
            Err(panic) => panic_message(panic.as_ref()),
        };

        reporter.report(WorkerEvent::Failed {
            job_id: self.job_id,
            error: &error,
        });
        self.mark_failed(&error);
        RunOutcome::Failed
    }

    /// The page loop. Page-level failures are absorbed here; anything
    /// returned as `Err` is job-level.
    pub async fn run<WR: WorkerReporter>(
        &self,
        cancel: &CancellationToken,
        reporter: &WR,
    ) -> Result<RunOutcome, AppError> {
        let job = match self.store.get(self.job_id) {
            Ok(job) => job,
            Err(AppError::NotFound(_)) => return Ok(RunOutcome::Stopped),
            Err(e) => return Err(e),
        };

        reporter.report(WorkerEvent::Started {
            job_id: job.id,
            max_pages: job.max_pages,
        });

        let delay = PageDelay::from_secs_f64(job.delay).with_jitter(self.config.delay_jitter);
        let run_started = Instant::now();
        let mut fetches: u64 = 0;

        for page in 1..=job.max_pages {
            let stopped = WorkerEvent::Stopped {
                job_id: job.id,
                page,
            };

            // Checkpoint
            if cancel.is_cancelled() {
                reporter.report(stopped);
                return Ok(RunOutcome::Stopped);
            }
            if self
                .persist_if_running(|j| j.progress = page_progress(page, j.max_pages))?
                .is_none()
            {
                reporter.report(stopped);
                return Ok(RunOutcome::Stopped);
            }

            tokio::select! {
                () = tokio::time::sleep(delay.next_delay()) => {}
                () = cancel.cancelled() => {
                    reporter.report(stopped);
                    return Ok(RunOutcome::Stopped);
                }
            }

            let page_url = build_page_url(&job.url, page, &self.config.page_param);
            let identity = self.identities.pick(job.use_proxy);
            let request = PageRequest {
                url: page_url.clone(),
                user_agent: identity.user_agent,
                proxy: identity.proxy,
                timeout: self.config.fetch_timeout,
            };

            let fetch_started = Instant::now();
            let fetched = tokio::select! {
                result = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(&request)) => {
                    result.unwrap_or_else(|_| Err(AppError::Timeout(self.config.fetch_timeout.as_secs())))
                }
                () = cancel.cancelled() => {
                    reporter.report(stopped);
                    return Ok(RunOutcome::Stopped);
                }
            };
            fetches += 1;

            if let Some(proxy) = &request.proxy {
                self.identities.proxies().record_outcome(
                    &proxy.id,
                    fetched.is_ok(),
                    fetch_started.elapsed(),
                );
            }

            let rpm = requests_per_min(fetches, run_started.elapsed());
            let response = fetched.and_then(|response| {
                if response.is_success() {
                    Ok(response)
                } else {
                    Err(AppError::HttpError(format!(
                        "HTTP {} for {}",
                        response.status, page_url
                    )))
                }
            });

            let body = match response {
                Ok(response) => response.body,
                Err(e) if e.is_page_level() => {
                    if self
                        .persist_if_running(|j| {
                            j.total_requests += 1;
                            j.requests_per_min = rpm;
                        })?
                        .is_none()
                    {
                        reporter.report(stopped);
                        return Ok(RunOutcome::Stopped);
                    }
                    reporter.report(WorkerEvent::PageSkipped {
                        job_id: job.id,
                        page,
                        url: &page_url,
                        error: &e,
                    });
                    let level = match e {
                        AppError::HttpError(_) => LogLevel::Warning,
                        _ => LogLevel::Error,
                    };
                    self.broadcaster.broadcast(Event::log(
                        level,
                        format!("Error scraping page {page}: {e}"),
                        Some(job.id),
                    ));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut items =
                self.extractor
                    .extract(&body, &job.selectors, self.config.items_per_page)?;
            items.truncate(self.config.items_per_page);
            let count = items.len();

            let Some(updated) = self.persist_if_running(|j| {
                j.items_scraped += count as u64;
                j.total_requests += 1;
                j.requests_per_min = rpm;
            })?
            else {
                reporter.report(stopped);
                return Ok(RunOutcome::Stopped);
            };

            reporter.report(WorkerEvent::PageScraped {
                job_id: job.id,
                page,
                items: count,
            });

            self.broadcaster.broadcast(Event::job_update(updated));
            if count > 0 {
                self.broadcaster
                    .broadcast(Event::scraped_items(job.id, items, page));
            }
            self.broadcaster.broadcast(Event::log(
                LogLevel::Info,
                format!(
                    "Scraped page {page} from {} - {count} items found",
                    job.name
                ),
                Some(job.id),
            ));
        }

        let finished = self.store.try_update(self.job_id, |j| {
            j.transition(JobStatus::Completed)?;
            j.progress = 100.0;
            j.requests_per_min = 0;
            Ok(())
        });

        match finished {
            Ok(done) => {
                reporter.report(WorkerEvent::Completed {
                    job_id: done.id,
                    total_items: done.items_scraped,
                });
                self.broadcaster.broadcast(Event::job_complete(done));
                Ok(RunOutcome::Completed)
            }
            // Paused or deleted between the last page and completion.
            Err(AppError::Conflict(_) | AppError::NotFound(_)) => {
                reporter.report(WorkerEvent::Stopped {
                    job_id: job.id,
                    page: job.max_pages,
                });
                Ok(RunOutcome::Stopped)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply `mutator` only while the job is still `running`.
    ///
    /// Returns `None` if the job has left `running` or no longer exists, in
    /// which case nothing was written.
    fn persist_if_running<M>(&self, mutator: M) -> Result<Option<Job>, AppError>
    where
        M: FnOnce(&mut Job),
    {
        let result = self.store.try_update(self.job_id, |job| {
            if !job.is_running() {
                return Err(AppError::Conflict(format!("job is {}", job.status)));
            }
            mutator(job);
            Ok(())
        });

        match result {
            Ok(job) => Ok(Some(job)),
            Err(AppError::Conflict(_) | AppError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn mark_failed(&self, error: &str) {
        let failed = self.store.try_update(self.job_id, |j| {
            j.transition(JobStatus::Error)?;
            j.requests_per_min = 0;
            j.error_message = Some(error.to_string());
            Ok(())
        });

        match failed {
            Ok(job) => {
                let message = AppError::JobFailed(format!("{}: {error}", job.name)).to_string();
                self.broadcaster.broadcast(Event::job_update(job));
                self.broadcaster
                    .broadcast(Event::log(LogLevel::Error, message, Some(self.job_id)));
            }
            Err(e) => {
                tracing::debug!(job_id = %self.job_id, error = %e, "Failure not recorded on job");
            }
        }
    }
}

/// URL for `page`: the base URL for page 1, then `?<param>=<page>` appended.
pub fn build_page_url(base: &str, page: u32, param: &str) -> String {
    if page <= 1 {
        return base.to_string();
    }
    match Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair(param, &page.to_string());
            url.into()
        }
        Err(_) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}{param}={page}")
        }
    }
}

/// Requests per minute over this run, with elapsed time floored at one second.
fn requests_per_min(fetches: u64, elapsed: Duration) -> u32 {
    let secs = elapsed.as_secs_f64().max(1.0);
    (fetches as f64 * 60.0 / secs).round().min(f64::from(u32::MAX)) as u32
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("worker panicked: {msg}")
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("worker panicked: {msg}")
    } else {
        "worker panicked".to_string()
    }
}
