//! HMPI Monitor - heavy-metal pollution monitoring service
//!
//! Polls the configured upstream providers, keeps a rolling history and
//! serves the dashboard API.
//!
//! # Usage
//!
//! ```bash
//! # Run the service (polls every 30s, API on 0.0.0.0:8080)
//! cargo run --release
//!
//! # One aggregation + insight cycle, printed as JSON
//! cargo run --release -- --once
//!
//! # Start with six months of fixture history per city
//! cargo run --release -- --seed-history
//! ```
//!
//! # Environment Variables
//!
//! - `HMPI_CONFIG`: path to a TOML config file
//! - `WAQI_API_KEY`: WAQI token (the WAQI adapter is skipped without it)
//! - `HMPI_CORS_ORIGINS`: comma-separated allowed origins
//! - `RUST_LOG`: logging level (default: info)

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Months, Utc};
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hmpi_monitor::aggregation::AggregationGateway;
use hmpi_monitor::api::{create_app, DashboardState};
use hmpi_monitor::config::{self, MonitorConfig};
use hmpi_monitor::fixtures;
use hmpi_monitor::insights::InsightSynthesizer;
use hmpi_monitor::pipeline::{MonitorHandle, MonitorState, Poller};
use hmpi_monitor::sources::{self, FallbackGenerator};
use hmpi_monitor::types::{DataInsight, InsightsSummary};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "hmpi-monitor")]
#[command(about = "Heavy-metal pollution monitoring service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Run one aggregation + insight cycle, print it as JSON and exit
    #[arg(long)]
    once: bool,

    /// Seed the store with fixture history for every configured city
    #[arg(long)]
    seed_history: bool,

    /// Disable the synthetic fallback; report disconnection instead
    #[arg(long)]
    no_fallback: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

// ============================================================================
// Task Management
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Poller,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::Poller => write!(f, "Poller"),
        }
    }
}

/// Everything the tasks share, built once at startup.
struct MonitorCore {
    poller: Arc<Poller>,
    state: DashboardState,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn build_core(config: &MonitorConfig, seed_history: bool) -> Result<MonitorCore> {
    let limits = config.metal_limits();
    let client = sources::http::build_client(config.polling.request_timeout())
        .context("Failed to build upstream HTTP client")?;

    let adapters = sources::build_adapters(&config.sources, client.clone(), &limits);
    let fallback = config
        .polling
        .enable_fallback
        .then(|| FallbackGenerator::new(limits.clone()));
    info!(
        adapters = adapters.len(),
        fallback = fallback.is_some(),
        "Aggregation gateway configured"
    );
    let gateway = Arc::new(AggregationGateway::new(adapters, fallback));

    let synthesizer = InsightSynthesizer::new(config.analysis.clone());
    let mut monitor = MonitorState::new(config);
    if seed_history {
        let start = Utc::now()
            .checked_sub_months(Months::new(6))
            .unwrap_or_else(Utc::now);
        for city in &config.sources.cities {
            monitor
                .store
                .seed_history(fixtures::generate_historical_data(city, start));
        }
        let insights = monitor.refresh_insights(&synthesizer);
        info!(
            readings = monitor.store.len(),
            insights, "Seeded store with fixture history"
        );
    }

    let handle = MonitorHandle::new(monitor);
    let state = DashboardState::from_config(handle.clone(), config, client, &limits);
    let poller = Arc::new(Poller::new(
        gateway,
        synthesizer,
        handle,
        config.polling.refresh_interval(),
    ));

    Ok(MonitorCore { poller, state })
}

/// HTTP server task; stops when `cancel_token` fires.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    state: DashboardState,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Serving dashboard API");

        let result = axum::serve(listener, create_app(state))
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Draining connections");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Stopped");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!(error = %e, "[HttpServer] Server failed");
                Err(anyhow::Error::new(e).context("HTTP server failed"))
            }
        }
    });
}

fn spawn_poller(
    task_set: &mut JoinSet<Result<TaskName>>,
    poller: Arc<Poller>,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[Poller] Task starting");
        poller.run(cancel_token).await;
        Ok(TaskName::Poller)
    });
}

/// Watch the tasks until shutdown. The first failure cancels the rest.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::Error::new(e).context("task panicked"));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Let the server finish draining after cancellation.
    while let Some(result) = task_set.join_next().await {
        if let Ok(Err(e)) = result {
            warn!("Task exited with error during shutdown: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Single Cycle
// ============================================================================

#[derive(serde::Serialize)]
struct OnceReport {
    outcome: hmpi_monitor::pipeline::PollOutcome,
    insights: Vec<DataInsight>,
    summary: InsightsSummary,
}

async fn run_once(poller: &Poller) -> Result<()> {
    let outcome = poller
        .poll_once()
        .await
        .context("Poll skipped: another poll was already in flight")?;

    let monitor = poller.handle().read().await;
    let report = OnceReport {
        outcome,
        insights: monitor.insights.clone(),
        summary: monitor.summary.clone(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize cycle report")?
    );
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_logging(args.log_json);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let mut monitor_config = MonitorConfig::load();
    if let Some(addr) = args.addr {
        monitor_config.server.addr = addr;
    }
    if args.no_fallback {
        monitor_config.polling.enable_fallback = false;
    }
    monitor_config
        .validate()
        .context("Invalid monitor configuration")?;
    config::init(monitor_config);
    let monitor_config = config::get();

    if monitor_config.sources.waqi_api_key.is_none() {
        warn!("WAQI_API_KEY not set, WAQI adapter will be skipped");
    }

    let core = build_core(monitor_config, args.seed_history)?;

    if args.once {
        return run_once(&core.poller).await;
    }

    info!("HMPI Monitor starting");
    info!(
        addr = %monitor_config.server.addr,
        interval_ms = monitor_config.polling.refresh_interval_ms,
        cities = monitor_config.sources.cities.len(),
        "Configuration"
    );

    let listener = tokio::net::TcpListener::bind(&monitor_config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", monitor_config.server.addr))?;
    info!("Dashboard API listening on http://{}", monitor_config.server.addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, core.state, cancel_token.clone());
    spawn_poller(&mut task_set, core.poller, cancel_token.clone());

    run_supervisor(&mut task_set, cancel_token).await?;

    info!("HMPI Monitor shutdown complete");
    Ok(())
}
