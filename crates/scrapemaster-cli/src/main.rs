mod output;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use scrapemaster_client::{CssExtractor, ReqwestFetcher};
use scrapemaster_core::config::EngineConfig;
use scrapemaster_core::events::{Event, LogLevel};
use scrapemaster_core::identity::{IdentityPool, ProxyPool};
use scrapemaster_core::job::{JobConfig, JobStatus};
use scrapemaster_core::models::Selectors;
use scrapemaster_core::orchestrator::Orchestrator;
use scrapemaster_core::store::InMemoryJobStore;
use scrapemaster_server::config::ServerConfig;
use scrapemaster_server::state::AppState;

use crate::output::{OutputFormat, RecordWriter};

#[derive(Parser)]
#[command(name = "scrapemaster", version, about = "Concurrent CSS-selector web scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scrape job and stream its records to stdout
    Scrape {
        /// Target URL (page 1; later pages add a page query parameter)
        #[arg(short, long)]
        url: String,

        /// Field selector as NAME=CSS; repeatable. `container=CSS` selects records.
        #[arg(short, long = "selector", value_parser = parse_selector, required = true)]
        selectors: Vec<(String, String)>,

        /// Job name shown in logs
        #[arg(short, long, default_value = "cli")]
        name: String,

        /// Number of pages to visit
        #[arg(short, long, default_value_t = 10)]
        max_pages: u32,

        /// Minimum seconds between pages
        #[arg(short, long, default_value_t = 1.0)]
        delay: f64,

        /// Route requests through the SCRAPEMASTER_PROXIES pool
        #[arg(long, default_value_t = false)]
        use_proxy: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Run the REST and WebSocket server
    Serve {
        #[arg(long, env = "SCRAPEMASTER_HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "SCRAPEMASTER_PORT", default_value_t = 8000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout carries only records.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("scrapemaster=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let engine = EngineConfig::from_env()?;
    let proxies = ProxyPool::from_env()?;

    match cli.command {
        Commands::Scrape {
            url,
            selectors,
            name,
            max_pages,
            delay,
            use_proxy,
            format,
        } => {
            let config = JobConfig::new(name, url, selectors.into_iter().collect())
                .with_max_pages(max_pages)
                .with_delay(delay)
                .with_proxy(use_proxy);
            cmd_scrape(config, format, engine, proxies).await?;
        }
        Commands::Serve { host, port } => {
            cmd_serve(ServerConfig { host, port }, engine, proxies).await?;
        }
    }

    Ok(())
}

fn parse_selector(raw: &str) -> Result<(String, String), String> {
    let (field, css) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=CSS, got '{raw}'"))?;
    let (field, css) = (field.trim(), css.trim());
    if field.is_empty() || css.is_empty() {
        return Err(format!("expected NAME=CSS, got '{raw}'"));
    }
    Ok((field.to_string(), css.to_string()))
}

async fn cmd_scrape(
    config: JobConfig,
    format: OutputFormat,
    engine: EngineConfig,
    proxies: ProxyPool,
) -> Result<()> {
    let fetcher = ReqwestFetcher::with_timeout(engine.fetch_timeout)
        .context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(
        InMemoryJobStore::new(),
        fetcher,
        CssExtractor::new(),
        IdentityPool::with_proxies(proxies),
        engine,
    );

    let selectors: Selectors = config.selectors.clone();
    let mut writer = RecordWriter::new(format, std::io::stdout().lock(), &selectors)?;
    let mut events = orchestrator.subscribe();
    let job = orchestrator.create_job(config).await?;
    tracing::info!(job_id = %job.id, url = %job.url, pages = job.max_pages, "Scraping");

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("Interrupted, stopping job");
                orchestrator.pause_job(job.id).await?;
                return Ok(());
            }
        };
        let Some(event) = event else {
            bail!("Event stream closed before the job finished");
        };
        if event.job_id().is_some_and(|id| id != job.id) {
            continue;
        }

        match event {
            Event::ScrapedItems { items, .. } => writer.write_page(&items)?,
            Event::Log { message, level, .. } => match level {
                LogLevel::Info => tracing::info!("{message}"),
                LogLevel::Warning => tracing::warn!("{message}"),
                LogLevel::Error => tracing::error!("{message}"),
            },
            Event::JobUpdate { job } if job.status == JobStatus::Error => {
                bail!(
                    "Job failed: {}",
                    job.error_message.unwrap_or_else(|| "unknown error".to_string())
                );
            }
            Event::JobUpdate { .. } => {}
            Event::JobComplete { job, total_items } => {
                tracing::info!(
                    total_items,
                    requests = job.total_requests,
                    "Finished {}",
                    job.name
                );
                break;
            }
        }
    }

    Ok(())
}

async fn cmd_serve(server: ServerConfig, engine: EngineConfig, proxies: ProxyPool) -> Result<()> {
    let state = Arc::new(AppState::from_config(engine, proxies)?);

    let addr = server.addr();
    tracing::info!("Starting server on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    scrapemaster_server::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown signal received");
    })
    .await?;

    Ok(())
}
