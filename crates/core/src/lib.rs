//! Core budget ledger logic for Eventledger.
//!
//! Event budgets, their embedded expense lines, the approval workflow and
//! the role policy that guards every operation. Nothing here talks HTTP or
//! SQL directly; storage is reached through the traits in [`store`].
//!
//! # Modules
//!
//! - `budget` - Budget aggregate, expense ledger and payload validation
//! - `workflow` - Expense review transitions
//! - `policy` - Role and ownership authorization
//! - `analytics` - Cross-event rollups
//! - `export` - Budget snapshots and document renderers
//! - `store` - Persistence traits and the in-memory store
//! - `services` - Ledger operations wired to the stores

pub mod analytics;
pub mod budget;
pub mod export;
pub mod policy;
pub mod services;
pub mod store;
pub mod workflow;

pub use services::{Ledger, LedgerError, LedgerSettings, LedgerStores};
