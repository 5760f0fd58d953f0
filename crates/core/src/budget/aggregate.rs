//! The budget aggregate root.
//!
//! `Budget` owns its expense entries and is the only way to change them.
//! Every mutating method ends by recomputing `spent_amount`, so the
//! invariant `spent_amount == Σ amount of approved entries` holds for any
//! value of this type that callers can observe.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use eventledger_shared::types::{BudgetId, EventId, ExpenseId, UserId};

use super::error::BudgetError;
use super::types::{
    BudgetDocument, BudgetPatch, BudgetStatus, ExpenseEntry, ExpensePatch, MAX_AMOUNT, NewBudget,
    NewExpense,
};
use crate::workflow::{ExpenseStatus, ReviewAction, WorkflowService};

/// Expense entries keyed by id, remembering submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseLedger {
    entries: HashMap<ExpenseId, ExpenseEntry>,
    order: Vec<ExpenseId>,
}

impl ExpenseLedger {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, id: ExpenseId) -> Option<&ExpenseEntry> {
        self.entries.get(&id)
    }

    /// Iterates entries in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &ExpenseEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    /// Sum of amounts over entries that count toward spend, or `None` if
    /// it does not fit in a `Decimal`.
    #[must_use]
    pub fn approved_total(&self) -> Option<Decimal> {
        self.entries
            .values()
            .filter(|e| e.status.counts_toward_spend())
            .try_fold(Decimal::ZERO, |sum, e| sum.checked_add(e.amount))
    }

    fn get_mut(&mut self, id: ExpenseId) -> Option<&mut ExpenseEntry> {
        self.entries.get_mut(&id)
    }

    fn push(&mut self, entry: ExpenseEntry) {
        // Ids are generated per entry; a duplicate replaces in place.
        if self.entries.insert(entry.id, entry.clone()).is_none() {
            self.order.push(entry.id);
        }
    }

    fn remove(&mut self, id: ExpenseId) -> Option<ExpenseEntry> {
        let removed = self.entries.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }
}

impl FromIterator<ExpenseEntry> for ExpenseLedger {
    fn from_iter<I: IntoIterator<Item = ExpenseEntry>>(iter: I) -> Self {
        let mut ledger = Self::default();
        for entry in iter {
            ledger.push(entry);
        }
        ledger
    }
}

/// A budget with its embedded expense ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BudgetDocument", from = "BudgetDocument")]
pub struct Budget {
    id: BudgetId,
    event_id: EventId,
    total_amount: Decimal,
    spent_amount: Decimal,
    status: BudgetStatus,
    expenses: ExpenseLedger,
    notes: Option<String>,
    created_by: UserId,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Budget {
    /// Opens a new, active budget with no expenses.
    #[must_use]
    pub fn open(input: NewBudget, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: BudgetId::new(),
            event_id: input.event_id,
            total_amount: input.total_amount,
            spent_amount: Decimal::ZERO,
            status: BudgetStatus::Active,
            expenses: ExpenseLedger::default(),
            notes: input.notes,
            created_by,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Budget ID.
    #[must_use]
    pub fn id(&self) -> BudgetId {
        self.id
    }

    /// Event this budget funds.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Allocation ceiling.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    /// Sum of approved expense amounts.
    #[must_use]
    pub fn spent_amount(&self) -> Decimal {
        self.spent_amount
    }

    /// Allocation left after approved spend; negative when overspent.
    #[must_use]
    pub fn remaining_amount(&self) -> Decimal {
        self.total_amount - self.spent_amount
    }

    /// Lifecycle status.
    #[must_use]
    pub fn status(&self) -> BudgetStatus {
        self.status
    }

    /// Expense entries.
    #[must_use]
    pub fn expenses(&self) -> &ExpenseLedger {
        &self.expenses
    }

    /// Looks up one expense entry.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExpenseNotFound` if the id is unknown.
    pub fn expense(&self, expense_id: ExpenseId) -> Result<&ExpenseEntry, BudgetError> {
        self.expenses
            .get(expense_id)
            .ok_or(BudgetError::ExpenseNotFound {
                budget_id: self.id,
                expense_id,
            })
    }

    /// Optional notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// User who created the budget.
    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    /// False once soft-deleted.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Version the budget was loaded at.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last update timestamp.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies edits to budget-level fields.
    pub fn apply_patch(&mut self, patch: &BudgetPatch, now: DateTime<Utc>) {
        if let Some(total_amount) = patch.total_amount {
            self.total_amount = total_amount;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(notes) = &patch.notes {
            self.notes.clone_from(notes);
        }
        self.touch(now);
    }

    /// Appends a pending expense submitted by `paid_by`.
    pub fn add_expense(
        &mut self,
        input: NewExpense,
        paid_by: UserId,
        now: DateTime<Utc>,
    ) -> ExpenseId {
        let entry = ExpenseEntry {
            id: ExpenseId::new(),
            category: input.category,
            amount: input.amount,
            description: input.description,
            date: input.date.unwrap_or(now),
            paid_by,
            receipt: input.receipt,
            status: ExpenseStatus::Pending,
            notes: input.notes,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };
        let id = entry.id;
        self.expenses.push(entry);
        self.touch(now);
        id
    }

    /// Edits an expense. Supplying amount or category resets it to pending.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExpenseNotFound` if the id is unknown.
    pub fn update_expense(
        &mut self,
        expense_id: ExpenseId,
        patch: &ExpensePatch,
        now: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        let budget_id = self.id;
        let entry = self
            .expenses
            .get_mut(expense_id)
            .ok_or(BudgetError::ExpenseNotFound {
                budget_id,
                expense_id,
            })?;

        let re_review = WorkflowService::requires_re_review(patch);

        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(amount) = patch.amount {
            entry.amount = amount;
        }
        if let Some(description) = &patch.description {
            entry.description.clone_from(description);
        }
        if let Some(receipt) = &patch.receipt {
            entry.receipt.clone_from(receipt);
        }
        if let Some(date) = patch.date {
            entry.date = date;
        }
        if let Some(notes) = &patch.notes {
            entry.notes.clone_from(notes);
        }
        if re_review {
            entry.status = ExpenseStatus::Pending;
            entry.reviewed_by = None;
            entry.reviewed_at = None;
        }
        entry.updated_at = now;

        self.touch(now);
        Ok(())
    }

    /// Records a review decision on an expense.
    ///
    /// Repeating the current status without new notes changes nothing and
    /// returns false.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExpenseNotFound` if the id is unknown, or
    /// `BudgetError::SpendOutOfRange` if approving would push the spent
    /// amount past [`MAX_AMOUNT`].
    pub fn review_expense(
        &mut self,
        expense_id: ExpenseId,
        action: ReviewAction,
    ) -> Result<bool, BudgetError> {
        let budget_id = self.id;
        let entry = self
            .expenses
            .get_mut(expense_id)
            .ok_or(BudgetError::ExpenseNotFound {
                budget_id,
                expense_id,
            })?;

        if WorkflowService::is_repeat(entry, &action) {
            return Ok(false);
        }
        if action.new_status.counts_toward_spend() && !entry.status.counts_toward_spend() {
            self.spent_amount
                .checked_add(entry.amount)
                .filter(|spent| *spent <= MAX_AMOUNT)
                .ok_or(BudgetError::SpendOutOfRange {
                    budget_id,
                    expense_id,
                })?;
        }

        entry.status = action.new_status;
        entry.reviewed_by = Some(action.reviewed_by);
        entry.reviewed_at = Some(action.reviewed_at);
        if action.notes.is_some() {
            entry.notes = action.notes;
        }
        entry.updated_at = action.reviewed_at;

        self.touch(action.reviewed_at);
        Ok(true)
    }

    /// Removes an expense.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::ExpenseNotFound` if the id is unknown.
    pub fn remove_expense(
        &mut self,
        expense_id: ExpenseId,
        now: DateTime<Utc>,
    ) -> Result<ExpenseEntry, BudgetError> {
        let removed = self
            .expenses
            .remove(expense_id)
            .ok_or(BudgetError::ExpenseNotFound {
                budget_id: self.id,
                expense_id,
            })?;
        self.touch(now);
        Ok(removed)
    }

    /// Soft-deletes the budget. Returns false if it was already inactive.
    pub fn deactivate(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.touch(now);
        true
    }

    /// Converts into the persisted shape.
    #[must_use]
    pub fn to_document(&self) -> BudgetDocument {
        self.clone().into()
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        // Approvals are range-checked in `review_expense`.
        self.spent_amount = self
            .expenses
            .approved_total()
            .unwrap_or(self.spent_amount);
        self.updated_at = now;
    }
}

impl From<BudgetDocument> for Budget {
    fn from(doc: BudgetDocument) -> Self {
        let expenses: ExpenseLedger = doc.expenses.into_iter().collect();
        Self {
            id: doc.id,
            event_id: doc.event_id,
            total_amount: doc.total_amount,
            spent_amount: expenses.approved_total().unwrap_or(doc.spent_amount),
            status: doc.status,
            expenses,
            notes: doc.notes,
            created_by: doc.created_by,
            is_active: doc.is_active,
            version: doc.version,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl From<Budget> for BudgetDocument {
    fn from(budget: Budget) -> Self {
        let Budget {
            id,
            event_id,
            total_amount,
            spent_amount,
            status,
            expenses,
            notes,
            created_by,
            is_active,
            version,
            created_at,
            updated_at,
        } = budget;

        let ExpenseLedger { mut entries, order } = expenses;
        let expenses = order
            .into_iter()
            .filter_map(|id| entries.remove(&id))
            .collect();

        Self {
            id,
            event_id,
            total_amount,
            spent_amount,
            status,
            expenses,
            notes,
            created_by,
            is_active,
            version,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "aggregate_props.rs"]
mod props;
