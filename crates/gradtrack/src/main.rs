use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use gradtrack::audit::{self, ProgramCatalog};
use gradtrack::config::ServerConfig;
use gradtrack::db::CreditDbManager;
use gradtrack::server::create_router;
use gradtrack::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;

    let db = CreditDbManager::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path))?;

    let catalog = match &config.catalog_dir {
        Some(dir) => ProgramCatalog::load_from_directory(dir)?,
        None => {
            warn!("No catalog directory configured; starting without public programs");
            ProgramCatalog::empty()
        }
    };

    if config.import_catalog_on_start && !catalog.is_empty() {
        audit::import_catalog(&db, &catalog).context("failed to import program catalog")?;
    }

    let address = format!("{}:{}", config.address, config.port);
    let state = Arc::new(AppState::new(db, catalog, config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Listening on http://{address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
