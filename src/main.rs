//! Entry point. Wires Metro output -> Scraper -> Hub -> WebSocket viewers.

mod bundler;
mod config;
mod hub;
mod scraper;
mod server;
mod types;
mod utils;

use std::{io, path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::bundler::Bundler;
use crate::hub::Hub;
use crate::server::ViewerState;
use crate::types::Envelope;

/// Capacity of the reader -> hub hand-off.
const LOG_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Parser)]
#[command(about = "Run Metro and relay tagged app logs to a browser debug viewer.")]
struct Cli {
    /// YAML config; defaults are used when the file does not exist.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
    /// React Native project root (prompted for when omitted).
    project: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let cfg = config::AppConfig::load_or_default(&cli.config)?;

    let project = match cli.project.or_else(|| cfg.bundler.project_path.clone()) {
        Some(p) => p,
        None => utils::prompt_project_path(&mut io::stdin().lock(), &mut io::stdout())
            .context("read project path")?,
    };

    // Metro -> hub (bounded, keeps line order per stream)
    let (log_tx, log_rx) = tokio::sync::mpsc::channel::<Envelope>(LOG_CHANNEL_CAPACITY);
    let mut metro = Bundler::launch(&cfg.bundler, &project, log_tx).context("start Metro")?;

    let viewer_listener = match TcpListener::bind(cfg.server.ws_addr()).await {
        Ok(l) => l,
        Err(e) => {
            metro.terminate();
            return Err(e).with_context(|| format!("bind websocket port {}", cfg.server.ws_port));
        }
    };

    // Viewer sessions -> hub
    let (hub_tx, hub_rx) = tokio::sync::mpsc::unbounded_channel();
    let hub = Hub::new(hub_rx, log_rx);

    tokio::spawn(server::serve_static(cfg.server.clone()));
    if cfg.server.open_browser {
        let url = cfg.server.viewer_url();
        let delay = Duration::from_millis(cfg.server.open_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            utils::open_in_browser(&url);
        });
    }

    let outcome = tokio::select! {
        _ = hub.run() => Ok(()),
        res = server::serve_viewers(viewer_listener, ViewerState::new(hub_tx)) => res,
        _ = shutdown_signal() => {
            info!("Shutting down...");
            Ok(())
        }
    };
    if let Err(e) = &outcome {
        error!("Bridge error: {:#}", e);
    }

    metro.terminate();
    info!("Debug bridge exited.");
    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
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
