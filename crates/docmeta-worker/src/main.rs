//! docmeta Worker - Delta metadata synchronization service
//!
//! This binary runs as a long-lived service (or a one-shot job) and:
//! - Walks the delta feed of one SharePoint document library
//! - Writes generated metadata back into each file's list-item fields
//! - Appends one NDJSON record per processed file
//! - Shuts down gracefully on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! `main` loads and validates the configuration, installs tracing, wires
//! the Graph, state and generator adapters into a [`DeltaEngine`], then
//! either performs a single run (`--once`) or polls on
//! `delta.poll_interval`. The loop is controlled by a `CancellationToken`
//! that is triggered on receipt of SIGTERM or SIGINT.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use docmeta_core::{config::Config, metadata::ExtensionMetadataGenerator};
use docmeta_graph::{
    auth::{ClientCredentialsConfig, ClientCredentialsProvider},
    client::GraphClient,
    provider::GraphDocumentLibrary,
    rate_limit::AdaptiveRateLimiter,
};
use docmeta_state::{FileCursorStore, NdjsonRecordSink};
use docmeta_sync::{DeltaEngine, EngineSettings, RunSummary};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "docmeta-worker",
    version,
    about = "Delta metadata synchronization worker for SharePoint document libraries"
)]
struct Cli {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Perform a single run and exit
    #[arg(long)]
    once: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Filter directive used when `RUST_LOG` is not set
fn filter_directive(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(config: &Config, verbose: u8) {
    let directive = filter_directive(&config.logging.level, verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Loads the configuration, overlays the environment and validates it
fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()),
    };
    config.apply_env();

    let errors = config.validate();
    if !errors.is_empty() {
        let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
        anyhow::bail!("Invalid configuration:\n  {}", details.join("\n  "));
    }

    Ok(config)
}

// ============================================================================
// Wiring
// ============================================================================

/// Builds the engine and its adapters from a validated configuration
fn build_engine(config: &Config) -> Result<DeltaEngine> {
    let library_config = &config.library;

    let credentials = ClientCredentialsProvider::new(&ClientCredentialsConfig::new(
        &library_config.tenant_id,
        &library_config.client_id,
        &library_config.client_secret,
    ))
    .context("Failed to create credential provider")?;

    let rate_limiter = Arc::new(AdaptiveRateLimiter::new(config.delta.rate_limit_per_second));
    let client = GraphClient::new(
        Arc::new(credentials),
        rate_limiter,
        Duration::from_secs(library_config.http_timeout),
    )
    .context("Failed to create Graph client")?;

    let library = GraphDocumentLibrary::new(Arc::new(client));
    let cursor_store = FileCursorStore::new(&library_config.state_file);
    let sink = NdjsonRecordSink::new(&library_config.output_path);

    Ok(DeltaEngine::new(
        Arc::new(library),
        Arc::new(cursor_store),
        Arc::new(sink),
        Arc::new(ExtensionMetadataGenerator::new()),
        EngineSettings::from(config),
    ))
}

// ============================================================================
// WorkerService
// ============================================================================

/// Runs the engine once or on a fixed poll interval until shutdown
struct WorkerService {
    engine: DeltaEngine,
    poll_interval: Duration,
    /// Token for signalling graceful shutdown to the engine and the loop
    shutdown: CancellationToken,
}

impl WorkerService {
    fn new(engine: DeltaEngine, poll_interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            engine,
            poll_interval,
            shutdown,
        }
    }

    /// Performs one run and logs its outcome
    async fn run_once(&self) -> Result<RunSummary> {
        let summary = self
            .engine
            .run_once(&self.shutdown)
            .await
            .context("Delta run failed")?;

        if summary.disabled {
            info!("Delta synchronization disabled (delta.enabled = false)");
        } else {
            info!(
                processed = summary.processed,
                updated = summary.updated,
                skipped = summary.skipped,
                failed = summary.failed,
                pages = summary.pages,
                cursor_saved = summary.cursor_saved,
                cancelled = summary.cancelled,
                duration_ms = summary.duration_ms,
                "Run summary"
            );
        }

        Ok(summary)
    }

    /// Polling loop
    ///
    /// A failed run is logged and retried on the next tick; only shutdown
    /// ends the loop.
    async fn run_loop(&self) -> Result<()> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting poll loop"
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }

            if let Err(e) = self.run_once().await {
                error!(error = %format!("{e:#}"), "Run failed, retrying next tick");
            }

            if self.shutdown.is_cancelled() {
                break;
            }
        }

        info!("Poll loop terminated");
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config, cli.verbose);

    info!(once = cli.once, "docmeta worker starting");

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let engine = build_engine(&config)?;
    let service = WorkerService::new(
        engine,
        Duration::from_secs(config.delta.poll_interval),
        shutdown_token,
    );

    let result = if cli.once {
        service.run_once().await.map(|_| ())
    } else {
        service.run_loop().await
    };

    match &result {
        Ok(()) => info!("docmeta worker shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "docmeta worker exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
