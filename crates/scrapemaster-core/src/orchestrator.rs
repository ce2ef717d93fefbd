//! Job lifecycle façade.
//!
//! The orchestrator owns one supervised task per running job and is the only
//! place workers are spawned or cancelled. Its worker registry enforces the
//! single-worker-per-job invariant: a new worker for an id is spawned only
//! after the previous one has been cancelled and has exited.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::analytics::Analytics;
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::events::{EventBroadcaster, Subscription};
use crate::identity::{IdentityPool, ProxyPool};
use crate::job::{Job, JobConfig, JobStatus};
use crate::store::JobStore;
use crate::traits::{Extractor, Fetcher};
use crate::worker::{RunOutcome, ScrapeWorker, TracingWorkerReporter};

struct WorkerHandle {
    cancel: CancellationToken,
    task: JoinHandle<RunOutcome>,
}

impl WorkerHandle {
    fn is_live(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the worker and wait for it to exit.
    async fn stop(self, job_id: Uuid) {
        self.cancel.cancel();
        match self.task.await {
            Ok(outcome) => tracing::debug!(%job_id, ?outcome, "Worker exited"),
            Err(e) => tracing::warn!(%job_id, error = %e, "Worker task ended abnormally"),
        }
    }
}

struct Shared<S, F, E> {
    store: S,
    fetcher: F,
    extractor: E,
    broadcaster: EventBroadcaster,
    identities: IdentityPool,
    config: Arc<EngineConfig>,
    workers: Mutex<HashMap<Uuid, WorkerHandle>>,
    tracker: TaskTracker,
}

/// Creates, starts, pauses and deletes jobs. Cheap to clone.
pub struct Orchestrator<S, F, E>
where
    S: JobStore,
    F: Fetcher,
    E: Extractor,
{
    shared: Arc<Shared<S, F, E>>,
}

impl<S, F, E> Clone for Orchestrator<S, F, E>
where
    S: JobStore,
    F: Fetcher,
    E: Extractor,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S, F, E> Orchestrator<S, F, E>
where
    S: JobStore,
    F: Fetcher,
    E: Extractor,
{
    pub fn new(
        store: S,
        fetcher: F,
        extractor: E,
        identities: IdentityPool,
        config: EngineConfig,
    ) -> Self {
        let broadcaster = EventBroadcaster::with_capacity(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                store,
                fetcher,
                extractor,
                broadcaster,
                identities,
                config: Arc::new(config),
                workers: Mutex::new(HashMap::new()),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Validate `config`, store the job and start its worker.
    pub async fn create_job(&self, config: JobConfig) -> Result<Job, AppError> {
        config.validate()?;
        self.shared.extractor.validate(&config.selectors)?;

        // Held from insert to spawn: a listable job always has its worker.
        let mut workers = self.lock_workers().await;
        let job = Job::new(config, self.shared.config.items_per_page);
        let id = self.shared.store.create(job);

        let job = self
            .shared
            .store
            .try_update(id, |j| j.transition(JobStatus::Running))?;
        self.spawn_worker(&mut workers, id);

        tracing::info!(job_id = %id, name = %job.name, url = %job.url, "Job created");
        Ok(job)
    }

    /// Run a `created` or `paused` job again from page 1.
    ///
    /// Terminal jobs are rejected with `Conflict`. A job that is already
    /// running with a live worker is returned unchanged.
    pub async fn start_job(&self, id: Uuid) -> Result<Job, AppError> {
        let mut workers = self.lock_workers().await;

        let current = self.shared.store.get(id)?;
        if current.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "Cannot start job {id}: it is already {}",
                current.status
            )));
        }
        if current.is_running() && workers.get(&id).is_some_and(WorkerHandle::is_live) {
            return Ok(current);
        }

        if let Some(lingering) = workers.remove(&id) {
            lingering.stop(id).await;
        }

        let job = self.shared.store.try_update(id, |j| {
            if j.status.is_terminal() {
                return Err(AppError::Conflict(format!(
                    "Cannot start job {id}: it is already {}",
                    j.status
                )));
            }
            if !j.is_running() {
                j.transition(JobStatus::Running)?;
            }
            j.progress = 0.0;
            j.requests_per_min = 0;
            Ok(())
        })?;
        self.spawn_worker(&mut workers, id);

        tracing::info!(job_id = %id, "Job started");
        Ok(job)
    }

    /// Pause a running job and wait for its worker to exit.
    ///
    /// Once this returns, the job emits no further events. Pausing a paused
    /// job is a no-op; pausing any other state is a `Conflict`.
    pub async fn pause_job(&self, id: Uuid) -> Result<Job, AppError> {
        let mut workers = self.lock_workers().await;

        self.shared.store.try_update(id, |j| match j.status {
            JobStatus::Running => {
                j.transition(JobStatus::Paused)?;
                j.requests_per_min = 0;
                Ok(())
            }
            JobStatus::Paused => Ok(()),
            other => Err(AppError::Conflict(format!(
                "Cannot pause job {id}: it is {other}"
            ))),
        })?;

        if let Some(worker) = workers.remove(&id) {
            worker.stop(id).await;
        }

        tracing::info!(job_id = %id, "Job paused");
        self.shared.store.get(id)
    }

    /// Cancel the job's worker, wait for it, then drop the job.
    pub async fn delete_job(&self, id: Uuid) -> Result<(), AppError> {
        let mut workers = self.lock_workers().await;

        self.shared.store.get(id)?;
        if let Some(worker) = workers.remove(&id) {
            worker.stop(id).await;
        }
        self.shared.store.delete(id)?;

        tracing::info!(job_id = %id, "Job deleted");
        Ok(())
    }

    pub fn get_job(&self, id: Uuid) -> Result<Job, AppError> {
        self.shared.store.get(id)
    }

    pub fn list_jobs(&self) -> Vec<Job> {
        self.shared.store.list()
    }

    pub fn analytics(&self) -> Analytics {
        Analytics::from_jobs(&self.shared.store.list())
    }

    pub fn subscribe(&self) -> Subscription {
        self.shared.broadcaster.subscribe()
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.shared.broadcaster
    }

    pub fn proxies(&self) -> &ProxyPool {
        self.shared.identities.proxies()
    }

    /// Number of workers that have not exited yet.
    pub async fn active_workers(&self) -> usize {
        self.lock_workers().await.len()
    }

    /// Cancel every worker and wait for all of them to exit.
    ///
    /// Jobs keep their current status; a job cut off mid-run stays `running`
    /// in the store and can be restarted with [`start_job`](Self::start_job).
    pub async fn shutdown(&self) {
        let mut workers = self.lock_workers().await;
        let count = workers.len();
        for (_, worker) in workers.drain() {
            worker.cancel.cancel();
        }
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        tracing::info!(workers = count, "All workers stopped");
    }

    /// Lock the worker registry, forgetting workers that already exited.
    async fn lock_workers(&self) -> MutexGuard<'_, HashMap<Uuid, WorkerHandle>> {
        let mut workers = self.shared.workers.lock().await;
        workers.retain(|_, worker| worker.is_live());
        workers
    }

    fn spawn_worker(&self, workers: &mut HashMap<Uuid, WorkerHandle>, id: Uuid) {
        let cancel = CancellationToken::new();
        let worker = ScrapeWorker::new(
            id,
            self.shared.store.clone(),
            self.shared.fetcher.clone(),
            self.shared.extractor.clone(),
            self.shared.broadcaster.clone(),
            self.shared.identities.clone(),
            Arc::clone(&self.shared.config),
        );
        let task = self
            .shared
            .tracker
            .spawn(worker.drive(cancel.clone(), TracingWorkerReporter));
        workers.insert(id, WorkerHandle { cancel, task });
    }
}
