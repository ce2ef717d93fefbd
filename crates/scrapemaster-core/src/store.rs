use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::job::Job;

/// Source of truth for job state.
///
/// Every operation is atomic with respect to other callers touching the same
/// id, and none of them suspend: workers rely on a read-modify-write never
/// interleaving with a pause or delete.
pub trait JobStore: Send + Sync + Clone + 'static {
    /// Insert a job, returning its id.
    fn create(&self, job: Job) -> Uuid;

    fn get(&self, id: Uuid) -> Result<Job, AppError>;

    /// Snapshot of every job, in insertion order.
    fn list(&self) -> Vec<Job>;

    /// Apply `mutator` under exclusive access to the job.
    ///
    /// If the mutator fails the job is left untouched. On success
    /// `updated_at` is bumped and the new state is returned.
    fn try_update<F>(&self, id: Uuid, mutator: F) -> Result<Job, AppError>
    where
        F: FnOnce(&mut Job) -> Result<(), AppError>;

    fn delete(&self, id: Uuid) -> Result<(), AppError>;

    fn update<F>(&self, id: Uuid, mutator: F) -> Result<Job, AppError>
    where
        F: FnOnce(&mut Job),
    {
        self.try_update(id, |job| {
            mutator(job);
            Ok(())
        })
    }

    fn len(&self) -> usize {
        self.list().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    jobs: HashMap<Uuid, Job>,
    order: Vec<Uuid>,
}

/// Process-local job store. Jobs are lost on restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned job store lock");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned job store lock");
            poisoned.into_inner()
        })
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, job: Job) -> Uuid {
        let id = job.id;
        let mut inner = self.write();
        if inner.jobs.insert(id, job).is_none() {
            inner.order.push(id);
        }
        id
    }

    fn get(&self, id: Uuid) -> Result<Job, AppError> {
        self.read()
            .jobs
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound(id))
    }

    fn list(&self) -> Vec<Job> {
        let inner = self.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    fn try_update<F>(&self, id: Uuid, mutator: F) -> Result<Job, AppError>
    where
        F: FnOnce(&mut Job) -> Result<(), AppError>,
    {
        let mut inner = self.write();
        let job = inner.jobs.get_mut(&id).ok_or(AppError::NotFound(id))?;

        let mut draft = job.clone();
        mutator(&mut draft)?;
        draft.updated_at = Utc::now();
        *job = draft;

        Ok(job.clone())
    }

    fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let mut inner = self.write();
        inner.jobs.remove(&id).ok_or(AppError::NotFound(id))?;
        inner.order.retain(|existing| *existing != id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.read().jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobConfig, JobStatus};
    use crate::models::Selectors;

    fn job(name: &str) -> Job {
        Job::new(
            JobConfig::new(
                name,
                "https://example.com",
                Selectors::new().with("title", "h1"),
            ),
            10,
        )
    }

    #[test]
    fn create_then_get() {
        let store = InMemoryJobStore::new();
        let original = job("a");
        let id = store.create(original.clone());

        assert_eq!(id, original.id);
        assert_eq!(store.get(id).unwrap(), original);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = InMemoryJobStore::new();
        let ids: Vec<Uuid> = ["first", "second", "third"]
            .into_iter()
            .map(|name| store.create(job(name)))
            .collect();

        let listed: Vec<Uuid> = store.list().into_iter().map(|j| j.id).collect();
        assert_eq!(listed, ids);

        store.delete(ids[1]).unwrap();
        let listed: Vec<Uuid> = store.list().into_iter().map(|j| j.id).collect();
        assert_eq!(listed, vec![ids[0], ids[2]]);
    }

    #[test]
    fn update_bumps_updated_at() {
        let store = InMemoryJobStore::new();
        let original = job("a");
        let id = store.create(original.clone());

        std::thread::sleep(std::time::Duration::from_millis(2));
        let updated = store.update(id, |j| j.items_scraped = 3).unwrap();

        assert_eq!(updated.items_scraped, 3);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(updated.created_at, original.created_at);
    }

    #[test]
    fn failed_mutator_leaves_job_untouched() {
        let store = InMemoryJobStore::new();
        let id = store.create(job("a"));
        let before = store.get(id).unwrap();

        let err = store
            .try_update(id, |j| {
                j.items_scraped = 99;
                j.transition(JobStatus::Completed)
            })
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.get(id).unwrap(), before);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = InMemoryJobStore::new();
        let id = Uuid::new_v4();

        assert!(matches!(store.get(id), Err(AppError::NotFound(_))));
        assert!(matches!(store.update(id, |_| {}), Err(AppError::NotFound(_))));
        assert!(matches!(store.delete(id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = InMemoryJobStore::new();
        let id = store.create(job("a"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.update(id, |j| j.items_scraped += 1).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get(id).unwrap().items_scraped, 800);
        assert_eq!(store.len(), 1);
    }
}
