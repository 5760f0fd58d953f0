//! Expense review workflow.
//!
//! # Modules
//!
//! - `types` - Review status and review audit record
//! - `service` - Transition and re-review rules

pub mod service;
pub mod types;

pub use service::WorkflowService;
pub use types::{ExpenseStatus, ReviewAction};
