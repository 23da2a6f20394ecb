//! docusign-gate - DocuSign consent gate and e-signature sidecar

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docusign_gate::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("docusign_gate={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let config = args.docusign_config();
    info!("======================================");
    info!("  docusign-gate");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("DocuSign: {}", config.url);
    info!("Domain: {}", config.domain);
    info!("Frame origin: {}", config.frontend_origin);
    info!("Request timeout: {} ms", args.request_timeout_ms);
    info!("======================================");

    let state = Arc::new(server::AppState::new(config)?);
    server::run(state, args.listen).await?;

    Ok(())
}
