use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use signet_core::storage::{PostgresStorage, Storage};
use signet_pipeline::client::{ProviderClient, ProviderConfig, SignatureTransport};
use signet_web::config::Config;
use signet_web::logging;
use signet_web::router::build_router;
use signet_web::state::AppState;

#[derive(Parser)]
#[command(name = "signet", about = "Back-office e-signature service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply the database schema and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> =
        Arc::new(PostgresStorage::connect(&config.postgres.url()).await?);
    storage.migrate().await?;

    if matches!(cli.command, Some(Command::Migrate)) {
        info!("schema migration complete");
        return Ok(());
    }

    let transport: Arc<dyn SignatureTransport> = Arc::new(ProviderClient::new(ProviderConfig {
        base_url: config.provider_base_url.clone(),
        api_key: config.provider_api_key.clone(),
        timeout: config.provider_timeout,
    }));

    let state = AppState::new(
        storage,
        transport,
        config.jwt_secret.clone(),
        config.webhook_secret.clone(),
    );
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!(%addr, "signet listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
