//! Budget error types.

use thiserror::Error;

use eventledger_shared::types::{BudgetId, EventId, ExpenseId};

/// Budget-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// Budget not found, or soft-deleted.
    #[error("Budget not found: {0}")]
    NotFound(BudgetId),

    /// Expense not found inside the budget.
    #[error("Expense {expense_id} not found in budget {budget_id}")]
    ExpenseNotFound {
        /// Parent budget.
        budget_id: BudgetId,
        /// Missing expense.
        expense_id: ExpenseId,
    },

    /// Event not found.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// Event already has an active budget.
    #[error("Event {0} already has an active budget")]
    ActiveBudgetExists(EventId),

    /// Approving the expense would take the spent amount out of range.
    #[error("Approving expense {expense_id} would exceed the maximum spend of budget {budget_id}")]
    SpendOutOfRange {
        /// Budget.
        budget_id: BudgetId,
        /// Expense being approved.
        expense_id: ExpenseId,
    },
}

impl BudgetError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::ExpenseNotFound { .. } | Self::EventNotFound(_) => 404,
            Self::ActiveBudgetExists(_) => 409,
            Self::SpendOutOfRange { .. } => 400,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "BUDGET_NOT_FOUND",
            Self::ExpenseNotFound { .. } => "EXPENSE_NOT_FOUND",
            Self::EventNotFound(_) => "EVENT_NOT_FOUND",
            Self::ActiveBudgetExists(_) => "ACTIVE_BUDGET_EXISTS",
            Self::SpendOutOfRange { .. } => "SPEND_OUT_OF_RANGE",
        }
    }
}
