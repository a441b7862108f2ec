//! Gullin Server: Application entry point.

use std::time::Duration;

use gullin_db::{DbManager, run_migrations};
use gullin_server::{App, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gullin=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting Gullin server...");

    let config = ServerConfig::from_env()?;
    let db = DbManager::connect(&config.db).await?;
    run_migrations(db.client()).await?;

    let app = App::build(db.client().clone(), &config)?;
    let sweeper = app.spawn_challenge_sweeper(Duration::from_secs(config.challenge_sweep_secs));

    tracing::info!("Gullin server ready");
    tokio::signal::ctrl_c().await?;

    sweeper.abort();
    tracing::info!("Gullin server stopped.");
    Ok(())
}
