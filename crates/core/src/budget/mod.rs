//! Event budgets and their embedded expense ledger.

pub mod aggregate;
pub mod error;
pub mod types;
pub mod validation;

pub use aggregate::{Budget, ExpenseLedger};
pub use error::BudgetError;
pub use types::{
    AMOUNT_SCALE, BudgetDocument, BudgetPatch, BudgetStatus, ExpenseCategory, ExpenseEntry,
    ExpensePatch, MAX_AMOUNT, NewBudget, NewExpense,
};
pub use validation::{
    BudgetFilter, BudgetForm, BudgetListForm, BudgetPatchForm, ExpenseForm, ExpensePatchForm,
    StatusForm, ValidationErrors,
};
