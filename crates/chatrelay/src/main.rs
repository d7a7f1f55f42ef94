use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chatrelay::catalog::SqliteCatalog;
use chatrelay::config::Config;
use chatrelay::server::{AppState, build_app};

#[derive(Parser)]
#[command(name = "chatrelay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Path to the YAML config file. A missing file means defaults.
        #[arg(short, long, default_value = "chatrelay.yaml")]
        config: PathBuf,
        /// Override `server.host`.
        #[arg(long)]
        host: Option<String>,
        /// Override `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, host, port } => serve(config, host, port).await,
    }
}

async fn serve(config_path: PathBuf, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = Config::load(&config_path)
        .await
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let catalog = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            info!(url = %url, "Opening catalog from DATABASE_URL");
            SqliteCatalog::connect(&url).await
        }
        _ => {
            info!(path = %config.database.path.display(), "Opening catalog database");
            SqliteCatalog::open(&config.database.path).await
        }
    }
    .context("failed to open catalog database")?;

    let state =
        AppState::from_config(&config, catalog).context("failed to build HTTP client")?;
    if state.defaults.api_key.is_none() {
        warn!(
            env = %config.llm.api_key_env,
            "No API key in environment; only catalog providers with keys will authenticate"
        );
    }

    let app = build_app(state, config.server.request_timeout_seconds);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "chatrelay listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
