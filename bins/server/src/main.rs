//! Ledgerline API Server
//!
//! Main entry point for the account ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledgerline_api::{AppState, create_router};
use ledgerline_core::ledger::{LedgerService, LedgerStore, MemoryLedgerStore};
use ledgerline_db::{PgLedgerStore, connect_with};
use ledgerline_shared::{
    AppConfig, AppError, AppResult, DatabaseConfig, JwtConfig, JwtService, StoreBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()
        .map_err(AppError::from)
        .context("Failed to load configuration")?;

    let store = open_store(&config.database)
        .await
        .context("Failed to open ledger store")?;
    let ledger = LedgerService::new(Arc::clone(&store), &config.ledger);
    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let state = AppState {
        ledger,
        jwt_service: Arc::new(jwt_service),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, closing ledger store");
    if let Err(e) = store.close().await {
        error!(error = %e, "Failed to close ledger store");
    }

    Ok(())
}

async fn open_store(config: &DatabaseConfig) -> AppResult<Arc<dyn LedgerStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            if config.url.is_empty() {
                return Err(AppError::Configuration(
                    "database.url is required for the postgres backend".to_string(),
                ));
            }
            let db = connect_with(config)
                .await
                .map_err(|e| AppError::Unavailable(e.to_string()))?;
            info!(max_connections = config.max_connections, "Connected to database");
            Ok(Arc::new(PgLedgerStore::new(db)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory ledger store; balances are lost on restart");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
