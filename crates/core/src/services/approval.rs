//! Expense submission, editing and review.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use eventledger_shared::types::{BudgetId, ExpenseId};

use super::{LedgerError, LedgerSettings, load_active, write_with_retry};
use crate::budget::{Budget, ExpenseForm, ExpensePatchForm, StatusForm};
use crate::policy::{Action, Actor, AuthorizationPolicy, Ownership};
use crate::store::BudgetStore;
use crate::workflow::WorkflowService;

/// Applies expense operations to budgets.
#[derive(Clone)]
pub struct ApprovalWorkflow {
    store: Arc<dyn BudgetStore>,
    settings: LedgerSettings,
}

/// Ownership of an expense that may not exist; a missing entry has no payer.
fn expense_ownership(budget: &Budget, expense_id: ExpenseId) -> Ownership {
    Ownership {
        budget_creator: Some(budget.created_by()),
        expense_payer: budget.expense(expense_id).ok().map(|e| e.paid_by),
    }
}

impl ApprovalWorkflow {
    /// Creates the workflow.
    #[must_use]
    pub fn new(store: Arc<dyn BudgetStore>, settings: LedgerSettings) -> Self {
        Self { store, settings }
    }

    /// Appends a pending expense paid by the actor.
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden`, `Validation` or
    /// `ConcurrentModification`.
    pub async fn add_expense(
        &self,
        budget_id: BudgetId,
        form: ExpenseForm,
        actor: &Actor,
    ) -> Result<(Budget, ExpenseId), LedgerError> {
        let budget = load_active(self.store.as_ref(), budget_id).await?;
        AuthorizationPolicy::authorize(
            actor,
            Action::AddExpense,
            &Ownership::budget(budget.created_by()),
        )?;
        let input = form.validate()?;

        let (stored, expense_id) = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| Ok(b.add_expense(input.clone(), actor.id, Utc::now())),
        )
        .await?;
        info!(%budget_id, %expense_id, actor_id = %actor.id, amount = %input.amount, "expense submitted");
        Ok((stored, expense_id))
    }

    /// Sets an expense's review status. Administrators only.
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden`, `Validation`,
    /// `Budget(ExpenseNotFound)` or `ConcurrentModification`.
    pub async fn set_status(
        &self,
        budget_id: BudgetId,
        expense_id: ExpenseId,
        form: StatusForm,
        actor: &Actor,
    ) -> Result<Budget, LedgerError> {
        let budget = load_active(self.store.as_ref(), budget_id).await?;
        AuthorizationPolicy::authorize(
            actor,
            Action::ReviewExpense,
            &expense_ownership(&budget, expense_id),
        )?;
        let (status, notes) = form.validate()?;
        let current = budget.expense(expense_id)?;
        let decision = WorkflowService::review(status, actor.id, Utc::now(), notes.clone());
        if WorkflowService::is_repeat(current, &decision) {
            return Ok(budget);
        }

        let (stored, changed) = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| {
                let action = WorkflowService::review(status, actor.id, Utc::now(), notes.clone());
                b.review_expense(expense_id, action)
                    .map_err(LedgerError::from)
            },
        )
        .await?;
        if changed {
            info!(%budget_id, %expense_id, actor_id = %actor.id, %status, "expense reviewed");
        }
        Ok(stored)
    }

    /// Edits an expense. Changing amount or category sends it back for review.
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden`, `Validation`,
    /// `Budget(ExpenseNotFound)` or `ConcurrentModification`.
    pub async fn update_expense(
        &self,
        budget_id: BudgetId,
        expense_id: ExpenseId,
        form: ExpensePatchForm,
        actor: &Actor,
    ) -> Result<Budget, LedgerError> {
        let budget = load_active(self.store.as_ref(), budget_id).await?;
        AuthorizationPolicy::authorize(
            actor,
            Action::EditExpense,
            &expense_ownership(&budget, expense_id),
        )?;
        let patch = form.validate()?;
        budget.expense(expense_id)?;

        let (stored, ()) = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| {
                b.update_expense(expense_id, &patch, Utc::now())
                    .map_err(LedgerError::from)
            },
        )
        .await?;
        info!(%budget_id, %expense_id, actor_id = %actor.id, "expense updated");
        Ok(stored)
    }

    /// Removes an expense.
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden`, `Budget(ExpenseNotFound)` or
    /// `ConcurrentModification`.
    pub async fn delete_expense(
        &self,
        budget_id: BudgetId,
        expense_id: ExpenseId,
        actor: &Actor,
    ) -> Result<Budget, LedgerError> {
        let budget = load_active(self.store.as_ref(), budget_id).await?;
        AuthorizationPolicy::authorize(
            actor,
            Action::DeleteExpense,
            &expense_ownership(&budget, expense_id),
        )?;
        budget.expense(expense_id)?;

        let (stored, _) = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| {
                b.remove_expense(expense_id, Utc::now())
                    .map_err(LedgerError::from)
            },
        )
        .await?;
        info!(%budget_id, %expense_id, actor_id = %actor.id, "expense deleted");
        Ok(stored)
    }
}
