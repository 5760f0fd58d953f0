//! Read-only budget view handed to renderers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use eventledger_shared::types::{BudgetId, EventId, UserId};

use crate::budget::{Budget, BudgetStatus, ExpenseEntry};

/// Expense line with the payer's display name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotExpense {
    /// The entry.
    #[serde(flatten)]
    pub entry: ExpenseEntry,
    /// Payer display name, if known.
    pub paid_by_name: Option<String>,
    /// Reviewer display name, if known.
    pub reviewed_by_name: Option<String>,
}

/// Budget snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetSnapshot {
    /// Budget ID.
    pub budget_id: BudgetId,
    /// Event ID.
    pub event_id: EventId,
    /// Event title, if the event could be resolved.
    pub event_title: Option<String>,
    /// Allocation ceiling.
    pub total_amount: Decimal,
    /// Approved spend.
    pub spent_amount: Decimal,
    /// Allocation minus approved spend.
    pub remaining_amount: Decimal,
    /// Lifecycle status.
    pub status: BudgetStatus,
    /// Budget notes.
    pub notes: Option<String>,
    /// Creator.
    pub created_by: UserId,
    /// Creator display name, if known.
    pub created_by_name: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Expense lines in submission order.
    pub expenses: Vec<SnapshotExpense>,
}

impl BudgetSnapshot {
    /// Builds a snapshot, resolving user ids through `names`.
    #[must_use]
    pub fn new(
        budget: &Budget,
        event_title: Option<String>,
        names: &HashMap<UserId, String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let name = |id: &UserId| names.get(id).cloned();
        let expenses = budget
            .expenses()
            .iter()
            .map(|entry| SnapshotExpense {
                paid_by_name: name(&entry.paid_by),
                reviewed_by_name: entry.reviewed_by.as_ref().and_then(name),
                entry: entry.clone(),
            })
            .collect();

        Self {
            budget_id: budget.id(),
            event_id: budget.event_id(),
            event_title,
            total_amount: budget.total_amount(),
            spent_amount: budget.spent_amount(),
            remaining_amount: budget.remaining_amount(),
            status: budget.status(),
            notes: budget.notes().map(str::to_string),
            created_by: budget.created_by(),
            created_by_name: name(&budget.created_by()),
            created_at: budget.created_at(),
            updated_at: budget.updated_at(),
            generated_at,
            expenses,
        }
    }

    /// Every user id the snapshot can name.
    #[must_use]
    pub fn user_ids(budget: &Budget) -> Vec<UserId> {
        let mut ids: Vec<UserId> = std::iter::once(budget.created_by())
            .chain(budget.expenses().iter().map(|e| e.paid_by))
            .chain(budget.expenses().iter().filter_map(|e| e.reviewed_by))
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}
