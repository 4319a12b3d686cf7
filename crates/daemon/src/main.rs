//! Dirshare Daemon
//!
//! Shares a directory over HTTP for browsing and download.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use daemon::config::Config;
use daemon::network::{display_urls, local_ipv4};
use daemon::{build_router, AppState};
use engine::ListOptions;
use tracing_subscriber::EnvFilter;

/// Dirshare - browse and download a directory from any browser on the network.
#[derive(Parser, Debug)]
#[command(name = "dirshare")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory to share (overrides share.root)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Port to listen on (overrides server.port)
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on (overrides server.bind)
    #[arg(short, long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Leave dot-files out of listings
    #[arg(long)]
    pub hide_hidden: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.share.root = Some(root.clone());
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if self.hide_hidden {
            config.share.include_hidden = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => Config::load(config_path)?,
        None => Config::load_default()?,
    };
    let env_overrides = config.apply_env_overrides();
    cli.apply_overrides(&mut config);
    config.validate()?;

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.log.level.to_lowercase()))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Dirshare starting...");
    if let Some(config_path) = &cli.config {
        tracing::info!("Using config file: {:?}", config_path);
    }
    for env_override in &env_overrides {
        env_override.log();
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let root = config.confined_root(&cwd)?;
    let addr = config.socket_addr()?;

    let options = ListOptions {
        include_hidden: config.share.include_hidden,
    };
    let app = build_router(Arc::new(AppState::new(root.clone(), options)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Serving {}", root.as_path().display());
    let lan = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => local_ipv4(),
        _ => None,
    };
    for url in display_urls(addr.ip(), addr.port(), lan) {
        tracing::info!("Listening on {}", url);
    }
    if !options.include_hidden {
        tracing::info!("Hidden entries are not listed");
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Dirshare stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Failed to register signal handlers, falling back to Ctrl+C: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT");
        }
    }
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
