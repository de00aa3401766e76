//! `allowance-desk` server binary.
//!
//! Reads configuration from the environment (and `.env`), opens the inventory
//! database, starts the retirement system and serves the HTTP API until
//! Ctrl-C.

use actor_framework::tracing::setup_tracing;
use allowance_desk::api::{self, AppState};
use allowance_desk::config::Config;
use allowance_desk::inventory::InventoryStorage;
use allowance_desk::lifecycle::{Collaborators, RetirementSystem};
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    dotenv::dotenv().ok();
    setup_tracing();

    let config = Config::from_env();
    info!(database = %config.database_path, port = config.http_port, "Starting allowance desk");

    let storage = InventoryStorage::open(&config.database_path)?;
    let collaborators = Collaborators::from_config(&config)?;
    let system = RetirementSystem::start(&config, storage, collaborators).await?;

    let state = AppState::new(
        system.reservations.clone(),
        system.history.clone(),
        system.inventory.clone(),
    );
    let app = api::router(state);

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP listening on {addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Could not listen for shutdown signal");
            }
            info!("Shutdown signal received");
        })
        .await;
    if let Err(e) = served {
        error!(error = %e, "HTTP server error");
    }

    system.shutdown().await?;
    Ok(())
}
