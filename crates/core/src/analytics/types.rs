//! Analytics data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::budget::ExpenseCategory;

/// Cross-event budget analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAnalytics {
    /// Headline totals.
    pub totals: AnalyticsTotals,
    /// Approved spend by category, largest first.
    pub by_category: Vec<CategoryTotal>,
    /// Approved spend per month, oldest first. Months without spend are omitted.
    pub monthly: Vec<MonthlyTotal>,
    /// Allocation and spend by event type, largest allocation first.
    pub by_event_type: Vec<EventTypeTotal>,
    /// Expenses waiting for review.
    pub pending_approvals: PendingApprovals,
}

/// Headline totals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalyticsTotals {
    /// Number of active budgets.
    pub budget_count: u64,
    /// Sum of allocations.
    pub total_allocated: Decimal,
    /// Sum of approved spend.
    pub total_spent: Decimal,
    /// Spent as a percentage of allocated, 2 dp; zero when nothing is allocated.
    pub utilization_percent: Decimal,
}

/// Category total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category.
    pub category: ExpenseCategory,
    /// Approved amount.
    pub total: Decimal,
    /// Number of approved entries.
    pub count: u64,
}

/// Monthly total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// Month as `YYYY-MM`.
    pub month: String,
    /// Approved amount.
    pub total: Decimal,
    /// Number of approved entries.
    pub count: u64,
}

/// Event type total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeTotal {
    /// Event type, `unknown` when the event has none.
    pub event_type: String,
    /// Sum of allocations.
    pub allocated: Decimal,
    /// Sum of approved spend.
    pub spent: Decimal,
    /// Number of budgets.
    pub budget_count: u64,
}

/// Pending approvals.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PendingApprovals {
    /// Number of pending entries.
    pub count: u64,
    /// Total amount pending.
    pub total_amount: Decimal,
}
