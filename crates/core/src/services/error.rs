//! Errors surfaced by ledger operations.

use thiserror::Error;

use eventledger_shared::{AppError, FieldError};
use eventledger_shared::types::{BudgetId, EventId};

use crate::budget::{BudgetError, ValidationErrors};
use crate::export::RenderError;
use crate::policy::PolicyDenial;
use crate::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Request Errors ==========
    /// The actor may not perform the action.
    #[error(transparent)]
    Forbidden(#[from] PolicyDenial),

    /// The payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    // ========== Domain Errors ==========
    /// Budget, expense or event lookup failed, or a uniqueness rule was hit.
    #[error(transparent)]
    Budget(#[from] BudgetError),

    /// Export could not be produced.
    #[error(transparent)]
    Render(#[from] RenderError),

    // ========== Concurrency Errors ==========
    /// Optimistic writes kept losing the race.
    #[error("Budget {budget_id} is being modified concurrently, please retry")]
    ConcurrentModification {
        /// Contended budget.
        budget_id: BudgetId,
        /// Attempts made.
        attempts: u32,
    },

    // ========== Infrastructure Errors ==========
    /// The new budget could not be linked to its event and was rolled back.
    #[error("Failed to link budget {budget_id} to event {event_id}")]
    LinkFailed {
        /// Event.
        event_id: EventId,
        /// Budget that was deactivated.
        budget_id: BudgetId,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(StoreError),

    /// Invalid ledger settings.
    #[error("Invalid ledger settings: {0}")]
    Settings(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateActive(event_id) => {
                Self::Budget(BudgetError::ActiveBudgetExists(event_id))
            }
            StoreError::NotFound(budget_id) => Self::Budget(BudgetError::NotFound(budget_id)),
            StoreError::VersionConflict { budget_id, .. } => Self::ConcurrentModification {
                budget_id,
                attempts: 1,
            },
            other @ StoreError::Backend(_) => Self::Store(other),
        }
    }
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Budget(e) => e.error_code(),
            Self::Render(RenderError::Unsupported(_)) => "UNSUPPORTED_FORMAT",
            Self::Render(RenderError::Encoding(_)) => "RENDER_ERROR",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::LinkFailed { .. } => "EVENT_LINK_FAILED",
            Self::Store(_) => "DATABASE_ERROR",
            Self::Settings(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(e) => e.status_code(),
            Self::Validation(_) | Self::Render(RenderError::Unsupported(_)) => 400,
            Self::Budget(e) => e.status_code(),
            Self::ConcurrentModification { .. } => 409,
            Self::Render(RenderError::Encoding(_))
            | Self::LinkFailed { .. }
            | Self::Store(_)
            | Self::Settings(_) => 500,
        }
    }

    /// Returns true if the client may safely repeat the request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Forbidden(_) => Self::Forbidden(message),
            LedgerError::Validation(v) => Self::Validation {
                message: "Invalid request".to_string(),
                fields: v.0,
            },
            LedgerError::Render(RenderError::Unsupported(_)) => Self::Validation {
                message: message.clone(),
                fields: vec![FieldError::new("format", message)],
            },
            LedgerError::Budget(BudgetError::ActiveBudgetExists(_)) => Self::Conflict(message),
            LedgerError::Budget(BudgetError::SpendOutOfRange { .. }) => Self::Validation {
                message: message.clone(),
                fields: vec![FieldError::new("amount", message)],
            },
            LedgerError::Budget(_) => Self::NotFound(message),
            LedgerError::ConcurrentModification { .. } => Self::ConcurrentModification(message),
            LedgerError::Store(_) => Self::Database(message),
            LedgerError::Render(RenderError::Encoding(_))
            | LedgerError::LinkFailed { .. }
            | LedgerError::Settings(_) => Self::Internal(message),
        }
    }
}
