//! Review rules for expense entries.
//!
//! Every status can be reached from every other status, and repeating a
//! decision changes nothing. Who may review is decided in `policy`; this
//! module decides when an edit invalidates a review.

use chrono::{DateTime, Utc};

use eventledger_shared::types::UserId;

use crate::budget::types::{ExpenseEntry, ExpensePatch};
use crate::workflow::types::{ExpenseStatus, ReviewAction};

/// Stateless service for expense review transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Builds the review action that moves an entry to `new_status`.
    ///
    /// Never fails: all transitions are valid. Blank notes are treated as
    /// absent.
    #[must_use]
    pub fn review(
        new_status: ExpenseStatus,
        reviewed_by: UserId,
        reviewed_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> ReviewAction {
        ReviewAction {
            new_status,
            reviewed_by,
            reviewed_at,
            notes: notes.filter(|n| !n.trim().is_empty()),
        }
    }

    /// Returns true if `action` would leave `entry` as it is: same status
    /// and no replacement notes.
    #[must_use]
    pub fn is_repeat(entry: &ExpenseEntry, action: &ReviewAction) -> bool {
        entry.status == action.new_status
            && entry.reviewed_by.is_some()
            && action.notes.as_ref().is_none_or(|n| entry.notes.as_ref() == Some(n))
    }

    /// Returns true if applying `patch` invalidates an entry's review.
    ///
    /// Supplying a financial field (amount or category) sends the entry back
    /// to `pending`, even when the value is unchanged.
    #[must_use]
    pub fn requires_re_review(patch: &ExpensePatch) -> bool {
        patch.amount.is_some() || patch.category.is_some()
    }
}
