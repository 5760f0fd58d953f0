//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - `PostgreSQL` implementations of the ledger storage traits
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{PgActorDirectory, PgBudgetStore, PgEventDirectory};

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use eventledger_core::LedgerStores;
use eventledger_shared::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by `config`.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Ledger storage backed by one connection pool.
#[must_use]
pub fn stores(db: &DatabaseConnection) -> LedgerStores {
    LedgerStores {
        budgets: Arc::new(PgBudgetStore::new(db.clone())),
        events: Arc::new(PgEventDirectory::new(db.clone())),
        actors: Arc::new(PgActorDirectory::new(db.clone())),
    }
}
