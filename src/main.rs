//! Warden - interaction core for a community-management chat bot

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warden::config::Args;
use warden::context::WardenContext;
use warden::handlers::{PingCommand, PointsSetCommand};
use warden::platform::console::ConsoleClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warden={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Warden - community bot core");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {}", args.mongodb_uri);
    info!("Developers: {}", args.developer_set().len());
    info!("Prompt timeout: {}s", args.prompt_timeout_seconds);
    info!("======================================");

    // The console client stands in until a gateway integration supplies a
    // real platform client.
    let platform = Arc::new(ConsoleClient::new());

    let mut ctx = WardenContext::connect(&args, platform).await?;

    // Built-in handler set; deployments register their catalog here.
    ctx.register_command(Arc::new(PingCommand))?;
    ctx.register_command(Arc::new(PointsSetCommand::new(args.prompt_timeout())))?;

    ctx.start()?;
    info!("Warden ready; awaiting inbound interactions");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining");
    ctx.shutdown().await?;

    Ok(())
}
