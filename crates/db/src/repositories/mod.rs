//! `PostgreSQL` implementations of the ledger's storage traits.

pub mod actor;
pub mod budget;
pub mod event;

pub use actor::PgActorDirectory;
pub use budget::PgBudgetStore;
pub use event::PgEventDirectory;

use sea_orm::DbErr;

use eventledger_core::store::StoreError;

/// Wraps a database error as a backend failure.
pub(crate) fn backend(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}
