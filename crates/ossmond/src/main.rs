//! ossmond — the ossmon daemon.
//!
//! Single binary that assembles the exporter:
//! - Configuration (TOML, one section per environment)
//! - One collection scheduler per environment
//! - Shared gauge store
//! - `/metrics` exposition
//!
//! # Usage
//!
//! ```text
//! ossmond --config /etc/ossmon/config.toml --log-format json
//! ```

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ossmon_core::ExporterConfig;
use ossmon_metrics::GaugeStore;
use ossmon_scheduler::{FatalError, Supervisor};

const DEFAULT_LOG_FILTER: &str = "info,ossmond=debug,ossmon=debug";

#[derive(Parser)]
#[command(name = "ossmond", about = "Aliyun OSS usage exporter")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(long)]
    listen: Option<String>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        error!(error = %e, "ossmond failed");
        return Err(e);
    }
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = ExporterConfig::from_file(&cli.config).map_err(FatalError::Config)?;
    if let Some(listen) = cli.listen {
        config.listen_address = listen;
    }
    let addr = config.listen_addr().map_err(FatalError::Config)?;

    info!(
        config = %cli.config.display(),
        environments = config.envs.len(),
        interval_secs = config.refresh_interval_second,
        "ossmond starting"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start collection ───────────────────────────────────────

    let store = GaugeStore::new();
    let mut supervisor = Supervisor::new(store.clone());
    supervisor.start(&config, shutdown_rx.clone())?;

    // ── Start exposition server ────────────────────────────────

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(source) => {
            let _ = shutdown_tx.send(true);
            supervisor.join().await;
            return Err(FatalError::Bind { addr, source }.into());
        }
    };
    info!(%addr, "metrics server listening");

    let router = ossmon_api::build_router(store);
    let signal_tx = shutdown_tx.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = signal_tx.send(true);
    });

    let served = server.await;
    // The server may also stop on its own error; stop collection either way.
    let _ = shutdown_tx.send(true);

    supervisor.join().await;

    let drain_timeout = config.drain_timeout();
    if !drain_timeout.is_zero() {
        if supervisor.drain(drain_timeout).await {
            info!("outstanding fetches drained");
        }
    } else if supervisor.in_flight() > 0 {
        warn!(
            outstanding = supervisor.in_flight(),
            "exiting with fetches still in flight"
        );
    }

    served?;
    info!("ossmond stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
