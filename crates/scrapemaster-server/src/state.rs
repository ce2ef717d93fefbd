use scrapemaster_client::{CssExtractor, ReqwestFetcher};
use scrapemaster_core::config::EngineConfig;
use scrapemaster_core::error::AppError;
use scrapemaster_core::identity::{IdentityPool, ProxyPool};
use scrapemaster_core::orchestrator::Orchestrator;
use scrapemaster_core::store::InMemoryJobStore;
use scrapemaster_core::traits::{Extractor, Fetcher};

use crate::ws::ConnectionTracker;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState<F = ReqwestFetcher, E = CssExtractor>
where
    F: Fetcher,
    E: Extractor,
{
    pub orchestrator: Orchestrator<InMemoryJobStore, F, E>,
    /// Open WebSocket connections.
    pub connections: ConnectionTracker,
}

impl<F, E> AppState<F, E>
where
    F: Fetcher,
    E: Extractor,
{
    pub fn new(orchestrator: Orchestrator<InMemoryJobStore, F, E>) -> Self {
        Self {
            orchestrator,
            connections: ConnectionTracker::default(),
        }
    }
}

impl AppState {
    /// Production wiring: reqwest fetcher, CSS extractor, in-memory store.
    pub fn from_config(engine: EngineConfig, proxies: ProxyPool) -> Result<Self, AppError> {
        let fetcher = ReqwestFetcher::with_timeout(engine.fetch_timeout)?;
        let orchestrator = Orchestrator::new(
            InMemoryJobStore::new(),
            fetcher,
            CssExtractor::new(),
            IdentityPool::with_proxies(proxies),
            engine,
        );
        Ok(Self::new(orchestrator))
    }
}
