use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;
use wolfconf_signaling::{HubConfig, Server};

use crate::args::Args;

mod args;

#[tokio::main]
async fn main() -> Result<(), wolfconf_signaling::Error> {
    // Initialize logger
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wolfconf_signaling=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse clap arguments
    let args = Args::parse();
    let config = HubConfig::from(&args);
    info!("Starting with {config:?}");

    let server = Server::bind(args.host, config).await?;
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Signaling server stopped, all rooms dissolved");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
