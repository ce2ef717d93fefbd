use serde::{Deserialize, Serialize};

use crate::job::{Job, JobStatus};

/// Read-only aggregate over the current jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    /// `completed / total * 100`, one decimal; 0 with no jobs.
    pub success_rate: f64,
    pub total_requests: u64,
    /// Sum of `items_scraped` over all jobs.
    pub data_points: u64,
    /// Jobs currently `running`.
    pub active_sessions: usize,
    pub total_jobs: usize,
    pub completed_jobs: usize,
}

impl Analytics {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let total_jobs = jobs.len();
        let completed_jobs = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .count();
        let success_rate = if total_jobs == 0 {
            0.0
        } else {
            (completed_jobs as f64 / total_jobs as f64 * 1000.0).round() / 10.0
        };

        Self {
            success_rate,
            total_requests: jobs.iter().map(|j| j.total_requests).sum(),
            data_points: jobs.iter().map(|j| j.items_scraped).sum(),
            active_sessions: jobs.iter().filter(|j| j.is_running()).count(),
            total_jobs,
            completed_jobs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobConfig;
    use crate::models::Selectors;

    fn job(status: JobStatus, items: u64, requests: u64) -> Job {
        let mut job = Job::new(
            JobConfig::new("a", "https://example.com", Selectors::new().with("t", "h1")),
            10,
        );
        job.status = status;
        job.items_scraped = items;
        job.total_requests = requests;
        job
    }

    #[test]
    fn empty_store_has_zero_success_rate() {
        let analytics = Analytics::from_jobs(&[]);
        assert_eq!(analytics.success_rate, 0.0);
        assert_eq!(analytics.total_jobs, 0);
        assert_eq!(analytics.completed_jobs, 0);
        assert_eq!(analytics.data_points, 0);
    }

    #[test]
    fn aggregates_over_jobs() {
        let jobs = vec![
            job(JobStatus::Completed, 10, 5),
            job(JobStatus::Running, 4, 2),
            job(JobStatus::Error, 0, 3),
        ];
        let analytics = Analytics::from_jobs(&jobs);

        assert_eq!(analytics.total_jobs, 3);
        assert_eq!(analytics.completed_jobs, 1);
        assert_eq!(analytics.success_rate, 33.3);
        assert_eq!(analytics.data_points, 14);
        assert_eq!(analytics.total_requests, 10);
        assert_eq!(analytics.active_sessions, 1);
    }
}
