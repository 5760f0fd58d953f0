//! Budget data types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use eventledger_shared::types::{BudgetId, EventId, ExpenseId, UserId};

use crate::workflow::types::ExpenseStatus;

/// Largest amount a budget or expense may carry: `NUMERIC(19,4)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, 4);

/// Decimal places kept on amounts.
pub const AMOUNT_SCALE: u32 = 4;

/// Lifecycle status of a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    /// Open for spending.
    #[default]
    Active,
    /// Event finished and the books are closed.
    Closed,
    /// Event called off.
    Cancelled,
}

impl BudgetStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "closed" => Some(Self::Closed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What an expense was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    /// Room or hall hire.
    Venue,
    /// Catering and refreshments.
    Food,
    /// Travel and freight.
    Transportation,
    /// Supplies, printing, equipment.
    Materials,
    /// Promotion and advertising.
    Marketing,
    /// Guest speaker fees.
    Speaker,
    /// Anything else.
    Other,
}

impl ExpenseCategory {
    /// All categories, in display order.
    pub const ALL: [Self; 7] = [
        Self::Venue,
        Self::Food,
        Self::Transportation,
        Self::Materials,
        Self::Marketing,
        Self::Speaker,
        Self::Other,
    ];

    /// Returns the string representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Venue => "venue",
            Self::Food => "food",
            Self::Transportation => "transportation",
            Self::Materials => "materials",
            Self::Marketing => "marketing",
            Self::Speaker => "speaker",
            Self::Other => "other",
        }
    }

    /// Parses a category from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One itemized cost claim inside a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseEntry {
    /// Entry ID, unique within the parent budget.
    pub id: ExpenseId,
    /// Expense category.
    pub category: ExpenseCategory,
    /// Claimed amount, never negative.
    pub amount: Decimal,
    /// What the money was spent on.
    pub description: String,
    /// When the expense was incurred.
    pub date: DateTime<Utc>,
    /// Who incurred and submitted the cost.
    pub paid_by: UserId,
    /// Opaque reference to the receipt held by the file store.
    pub receipt: String,
    /// Review status.
    pub status: ExpenseStatus,
    /// Free text, usually from the approver.
    pub notes: Option<String>,
    /// Last approver to review the entry.
    pub reviewed_by: Option<UserId>,
    /// When the entry was last reviewed.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Submission timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Persisted shape of a budget.
///
/// This is what stores read and write and what the API serializes.
/// Converting it into a `Budget` recomputes `spent_amount` from
/// `expenses`, so a stale stored value can never leak into the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDocument {
    /// Budget ID.
    pub id: BudgetId,
    /// Event this budget funds.
    pub event_id: EventId,
    /// Allocation ceiling.
    pub total_amount: Decimal,
    /// Sum of approved expense amounts.
    pub spent_amount: Decimal,
    /// Lifecycle status.
    pub status: BudgetStatus,
    /// Expense entries in submission order.
    pub expenses: Vec<ExpenseEntry>,
    /// Optional notes.
    pub notes: Option<String>,
    /// User who created the budget.
    pub created_by: UserId,
    /// False once soft-deleted.
    pub is_active: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBudget {
    /// Event the budget belongs to.
    pub event_id: EventId,
    /// Allocation ceiling.
    pub total_amount: Decimal,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Editable budget fields.
///
/// `spent_amount` and `expenses` are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetPatch {
    /// New allocation ceiling.
    pub total_amount: Option<Decimal>,
    /// New lifecycle status.
    pub status: Option<BudgetStatus>,
    /// New notes; `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}

impl BudgetPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_amount.is_none() && self.status.is_none() && self.notes.is_none()
    }
}

/// Input for submitting an expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    /// Expense category.
    pub category: ExpenseCategory,
    /// Claimed amount.
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Receipt reference.
    pub receipt: String,
    /// Expense date; submission time when absent.
    pub date: Option<DateTime<Utc>>,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Editable expense fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpensePatch {
    /// New category.
    pub category: Option<ExpenseCategory>,
    /// New amount.
    pub amount: Option<Decimal>,
    /// New description.
    pub description: Option<String>,
    /// New receipt reference.
    pub receipt: Option<String>,
    /// New expense date.
    pub date: Option<DateTime<Utc>>,
    /// New notes; `Some(None)` clears them.
    pub notes: Option<Option<String>>,
}

impl ExpensePatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.amount.is_none()
            && self.description.is_none()
            && self.receipt.is_none()
            && self.date.is_none()
            && self.notes.is_none()
    }
}
