//! Authorization for ledger operations.
//!
//! One table decides every action. It runs before payloads are validated
//! and before anything is loaded for mutation.

pub mod rules;
pub mod types;

pub use rules::{AuthorizationPolicy, PolicyDenial};
pub use types::{Action, Actor, Ownership, Role};
