use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use scrapemaster_core::error::AppError;
use scrapemaster_core::identity::ProxyServer;
use scrapemaster_core::traits::{Fetcher, PageRequest, PageResponse};

/// Proxied clients kept alive at once.
const MAX_PROXY_CLIENTS: u64 = 64;

/// HTTP fetcher using reqwest.
///
/// Direct requests share one client. Each proxy gets its own client, built on
/// first use and cached by proxy address. Environment proxy settings are
/// ignored; routing follows the request's identity only.
#[derive(Clone)]
pub struct ReqwestFetcher {
    direct: Client,
    proxied: Cache<String, Client>,
    timeout: Duration,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// `timeout` is the client-level ceiling; each request may set a shorter one.
    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            direct: build_client(timeout, None)?,
            proxied: Cache::builder()
                .max_capacity(MAX_PROXY_CLIENTS)
                .time_to_idle(Duration::from_secs(600))
                .build(),
            timeout,
        })
    }

    async fn client_for(&self, proxy: Option<&ProxyServer>) -> Result<Client, AppError> {
        let Some(proxy) = proxy else {
            return Ok(self.direct.clone());
        };

        let address = proxy.address();
        let timeout = self.timeout;
        let key = address.clone();
        self.proxied
            .try_get_with(key, async move { build_client(timeout, Some(&address)) })
            .await
            .map_err(|e: Arc<AppError>| {
                AppError::NetworkError(format!("Proxy {} unusable: {e}", proxy.id))
            })
    }
}

fn build_client(timeout: Duration, proxy: Option<&str>) -> Result<Client, AppError> {
    let mut builder = Client::builder().timeout(timeout).no_proxy();
    if let Some(address) = proxy {
        let proxy = Proxy::all(address)
            .map_err(|e| AppError::ConfigError(format!("Invalid proxy {address}: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| AppError::HttpError(e.to_string()))
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<PageResponse, AppError> {
        let client = self.client_for(request.proxy.as_ref()).await?;
        let timeout_secs = request.timeout.as_secs();

        let response = client
            .get(&request.url)
            .header(USER_AGENT, &request.user_agent)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        tracing::debug!(url = %request.url, status, proxy = ?request.proxy.as_ref().map(|p| &p.id), "Fetched");

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(timeout_secs)
            } else {
                AppError::NetworkError(format!("Failed to read response body: {e}"))
            }
        })?;

        Ok(PageResponse { status, body })
    }
}
