//! edge-worker -- runs the edge job loop against a coordinator.
//!
//! Registers this device, then ticks until SIGINT/SIGTERM. Executors are
//! external commands configured under `[executors]`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use edgeloop_coordinator::HttpCoordinatorClient;
use edgeloop_core::config::{load_dotenv, Config};
use edgeloop_queue::DurableQueue;
use edgeloop_worker::{EdgeWorker, ExecutorRegistry, PendingSubmission, ProcessExecutor, SysfsTelemetry};

// ── CLI ─────────────────────────────────────────────────────────────

/// Edge worker: claims jobs from the coordinator and runs them locally.
#[derive(Parser, Debug)]
#[command(name = "edge-worker", version, about)]
struct Cli {
    /// Path to the TOML config file. Missing file means defaults.
    #[arg(long, env = "EDGELOOP_CONFIG", default_value = "edgeloop.toml")]
    config: PathBuf,

    /// Coordinator base URL, overriding the config file.
    #[arg(long)]
    coordinator_url: Option<String>,

    /// Run a single tick, print its outcome and exit.
    #[arg(long)]
    once: bool,

    /// Seconds to wait for in-flight jobs on shutdown.
    #[arg(long, env = "EDGELOOP_SHUTDOWN_TIMEOUT", default_value_t = 30)]
    shutdown_timeout: u64,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(Some(&cli.config))
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(url) = cli.coordinator_url {
        config.coordinator.base_url = url;
        config.validate()?;
    }
    config.log_summary();

    let mut executors = ExecutorRegistry::new();
    for (job_type, command) in config.executor_commands()? {
        executors.register(Arc::new(ProcessExecutor::from_command(job_type, command)))?;
    }
    if executors.is_empty() {
        warn!("no executors configured; this node will never take a job");
    }

    let coordinator = Arc::new(
        HttpCoordinatorClient::new(&config.coordinator).context("building coordinator client")?,
    );
    let telemetry = Arc::new(SysfsTelemetry::default());
    let total_memory_mb = telemetry.total_memory_mb();

    let mut worker = EdgeWorker::new(config.worker.clone(), coordinator, executors, telemetry);
    match total_memory_mb {
        Some(mb) => {
            let capabilities = worker.capabilities().with_total_memory_mb(mb);
            worker = worker.with_capabilities(capabilities);
        }
        None => warn!("could not read total memory; advertising 0 MB"),
    }
    if config.outbox.enabled {
        let outbox = DurableQueue::<PendingSubmission>::open(&config.outbox.path, config.outbox.max_retries)
            .with_context(|| format!("opening outbox at {}", config.outbox.path.display()))?;
        info!(path = %config.outbox.path.display(), pending = outbox.pending_count(), "outbox enabled");
        worker = worker.with_outbox(Arc::new(outbox));
    }
    let worker = Arc::new(worker);

    worker
        .register()
        .await
        .with_context(|| format!("registering with {}", config.coordinator.base_url))?;

    if cli.once {
        let outcome = worker.tick().await;
        println!("{outcome:?}");
        println!("{}", serde_json::to_string_pretty(&worker.statistics())?);
        return Ok(());
    }

    worker.start()?;
    info!("edge-worker running");

    os_signal().await?;
    info!("shutdown signal received");
    worker.stop();

    let grace = Duration::from_secs(cli.shutdown_timeout);
    if tokio::time::timeout(grace, worker.wait_stopped()).await.is_err() {
        warn!(timeout = ?grace, "in-flight work did not finish before shutdown timeout");
    }

    let stats = worker.statistics();
    info!(
        completed = stats.total_completed,
        failed = stats.total_failed,
        credits = stats.total_credits_earned,
        "edge-worker exited"
    );
    Ok(())
}

async fn os_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
