//! siteproxy daemon
//!
//! Serves the site monitor's HTTP API.

use anyhow::Context;
use clap::Parser;
use siteproxy_api::create_router;
use siteproxy_core::{ProxyConfig, SiteRegistry};
use siteproxy_monitor::SiteMonitor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// siteproxyd - status service for code-review site selection
#[derive(Parser, Debug)]
#[command(name = "siteproxyd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Config file (default $HOME/.siteproxy/siteproxy.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind the API server
    #[arg(long)]
    address: Option<String>,

    /// Port for the REST API server
    #[arg(long)]
    port: Option<u16>,

    /// Seconds between background refresh rounds (0 disables)
    #[arg(long)]
    refresh_interval: Option<u64>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Installed before the config loads; the configured level is applied after
    let filter = init_logging(args.log_level.as_deref().unwrap_or("info"));

    let config = ProxyConfig::load_or_init(args.config.as_deref())
        .context("failed to load configuration")?;

    if args.log_level.is_none() {
        set_level(&filter, &config.logging.level)?;
    }

    info!("Starting siteproxy daemon v{}", env!("CARGO_PKG_VERSION"));

    let registry = SiteRegistry::from_config(&config).context("invalid site configuration")?;
    if registry.is_empty() {
        warn!("No sites configured; selection requests will fail");
    }

    let monitor = Arc::new(SiteMonitor::with_ssh(registry, &config.monitor));

    let refresh_secs = args
        .refresh_interval
        .unwrap_or(config.monitor.refresh_interval_secs);
    let refresher = if refresh_secs > 0 {
        info!(interval_secs = refresh_secs, "Background refresh enabled");
        Some(monitor.spawn_refresh(Duration::from_secs(refresh_secs)))
    } else {
        None
    };

    let router = create_router(Arc::clone(&monitor));

    let address = args.address.unwrap_or(config.api.address);
    let port = args.port.unwrap_or(config.api.port);
    let addr: SocketAddr = format!("{}:{}", address, port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&monitor)))
        .await
        .context("server error")?;

    if let Some(handle) = refresher {
        if let Err(e) = handle.await {
            warn!(error = %e, "Refresh task ended abnormally");
        }
    }

    info!("siteproxy daemon stopped");
    Ok(())
}

/// `RUST_LOG` wins over `level` when set
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn init_logging(level: &str) -> FilterHandle {
    let (filter, handle) = reload::Layer::new(env_filter(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
    handle
}

fn set_level(handle: &FilterHandle, level: &str) -> anyhow::Result<()> {
    handle
        .reload(env_filter(level))
        .with_context(|| format!("failed to apply log level {}", level))
}

/// Resolve on Ctrl-C or SIGTERM, then stop the monitor
async fn shutdown_signal(monitor: Arc<SiteMonitor>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutting down server");
    monitor.shutdown();
}
