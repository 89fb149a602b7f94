//! Elevator Movement Log - Main Entry Point

use api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load()?;
    init_logging(&config.logging)?;

    info!("=== Elevator Movement Log v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database.url);

    run_server(config).await?;

    Ok(())
}
