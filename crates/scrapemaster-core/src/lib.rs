pub mod analytics;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod job;
pub mod models;
pub mod orchestrator;
pub mod pacing;
pub mod store;
pub mod traits;
pub mod worker;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use analytics::Analytics;
pub use config::EngineConfig;
pub use error::AppError;
pub use events::{Event, EventBroadcaster, LogLevel, Subscription};
pub use identity::{IdentityPool, ProxyPool, ProxyServer, ProxyStatus};
pub use job::{Job, JobConfig, JobStatus};
pub use models::{Record, Selectors};
pub use orchestrator::Orchestrator;
pub use store::{InMemoryJobStore, JobStore};
pub use traits::{Extractor, Fetcher, PageRequest, PageResponse};
pub use worker::{RunOutcome, ScrapeWorker, TracingWorkerReporter, WorkerReporter};
