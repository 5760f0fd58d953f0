//! Eventledger API Server
//!
//! Main entry point for the event budget ledger service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use eventledger_api::{AppState, create_router};
use eventledger_core::export::RendererRegistry;
use eventledger_core::store::InMemoryStore;
use eventledger_core::{Ledger, LedgerSettings, LedgerStores};
use eventledger_shared::{AppConfig, JwtService, StorageBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let settings = LedgerSettings::try_from(&config.ledger)?;

    let stores = match config.ledger.storage {
        StorageBackend::Postgres => {
            let db = eventledger_db::connect_pool(&config.database).await?;
            info!("Connected to database");
            eventledger_db::stores(&db)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; budgets are lost on restart");
            LedgerStores::in_memory(Arc::new(InMemoryStore::new()))
        }
    };

    let ledger = Ledger::new(&stores, settings, RendererRegistry::default());

    if config.ledger.reconcile_on_startup {
        match ledger.repository.reconcile().await {
            Ok(report) => info!(
                cleared = report.cleared,
                restored = report.restored,
                "Event links reconciled"
            ),
            Err(err) => warn!(error = %err, "Event link reconciliation failed"),
        }
    }

    let state = AppState {
        ledger: Arc::new(ledger),
        jwt_service: Arc::new(JwtService::new(&config.jwt)),
    };
    let app = create_router(
        state,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
