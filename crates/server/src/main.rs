use std::{path::PathBuf, sync::Arc};

use ci_gatekeeper_developer_platforms::github::create_app_client;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
use config::AppConfig;

mod errors;
use errors::ServerError;

mod webhook;
use webhook::{build_router, AppState};

/// GitHub App that reports CI results on pull requests and merges them on request
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Default gatekeeper configuration for repositories without one of their own
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on. Overrides CI_GATEKEEPER_PORT
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_env("CI_GATEKEEPER_LOG"))
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::from_env().inspect_err(|e| {
        error!(error = %e, "Failed to read the server configuration");
    })?;
    if let Some(path) = &cli.config {
        config = config.with_defaults_from(path)?;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    let github = create_app_client(config.app_id, &config.app_private_key)
        .map_err(|e| ServerError::AuthError(e.to_string()))?;

    let state = Arc::new(AppState::new(&config, github));
    let app = build_router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "Listening for webhook deliveries");

    axum::serve(listener, app).await?;
    Ok(())
}
