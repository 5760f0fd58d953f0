//! Shared types, errors, and configuration for Eventledger.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types with a structured response body
//! - Configuration management
//! - Bearer token validation

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::{AppConfig, DatabaseConfig, JwtConfig, LedgerConfig, ServerConfig, StorageBackend};
pub use error::{AppError, AppResult, ErrorBody, FieldError};
pub use jwt::{JwtError, JwtService};
