//! Rollups across many budgets.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;

use eventledger_shared::types::EventId;

use super::types::{
    AnalyticsTotals, BudgetAnalytics, CategoryTotal, EventTypeTotal, MonthlyTotal,
    PendingApprovals,
};
use crate::budget::{Budget, ExpenseCategory};
use crate::workflow::ExpenseStatus;

/// Months in the trailing window, current month included.
pub const TRAILING_MONTHS: i32 = 12;

/// Event type label used when an event has none.
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Read-only aggregation over budgets.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsAggregator {
    tz: Tz,
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl AnalyticsAggregator {
    /// Creates an aggregator that buckets months in `tz`.
    #[must_use]
    pub const fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Summarizes the active budgets in `budgets`.
    ///
    /// `event_types` maps each event to its type; events that are missing
    /// or have no type are grouped as `unknown`. Never fails: empty input
    /// yields empty collections and zero scalars, and sums that do not fit
    /// in a `Decimal` saturate at `Decimal::MAX`.
    #[must_use]
    pub fn summarize(
        &self,
        budgets: &[Budget],
        event_types: &HashMap<EventId, Option<String>>,
        as_of: DateTime<Utc>,
    ) -> BudgetAnalytics {
        let current = month_index(as_of.with_timezone(&self.tz).date_naive());
        let window_start = current - (TRAILING_MONTHS - 1);

        let mut totals = AnalyticsTotals::default();
        let mut categories: HashMap<ExpenseCategory, (Decimal, u64)> = HashMap::new();
        let mut months: BTreeMap<i32, (Decimal, u64)> = BTreeMap::new();
        let mut event_type_totals: HashMap<String, EventTypeTotal> = HashMap::new();
        let mut pending = PendingApprovals::default();

        for budget in budgets.iter().filter(|b| b.is_active()) {
            totals.budget_count += 1;
            totals.total_allocated = totals.total_allocated.saturating_add(budget.total_amount());
            totals.total_spent = totals.total_spent.saturating_add(budget.spent_amount());

            let event_type = event_types
                .get(&budget.event_id())
                .cloned()
                .flatten()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_EVENT_TYPE.to_string());
            let group = event_type_totals
                .entry(event_type.clone())
                .or_insert_with(|| EventTypeTotal {
                    event_type,
                    allocated: Decimal::ZERO,
                    spent: Decimal::ZERO,
                    budget_count: 0,
                });
            group.allocated = group.allocated.saturating_add(budget.total_amount());
            group.spent = group.spent.saturating_add(budget.spent_amount());
            group.budget_count += 1;

            for entry in budget.expenses().iter() {
                match entry.status {
                    ExpenseStatus::Approved => {
                        let slot = categories
                            .entry(entry.category)
                            .or_insert((Decimal::ZERO, 0));
                        slot.0 = slot.0.saturating_add(entry.amount);
                        slot.1 += 1;

                        let month = month_index(entry.date.with_timezone(&self.tz).date_naive());
                        if (window_start..=current).contains(&month) {
                            let slot = months.entry(month).or_insert((Decimal::ZERO, 0));
                            slot.0 = slot.0.saturating_add(entry.amount);
                            slot.1 += 1;
                        }
                    }
                    ExpenseStatus::Pending => {
                        pending.count += 1;
                        pending.total_amount = pending.total_amount.saturating_add(entry.amount);
                    }
                    ExpenseStatus::Rejected => {}
                }
            }
        }

        totals.utilization_percent =
            utilization_percent(totals.total_spent, totals.total_allocated);

        let mut by_category: Vec<CategoryTotal> = categories
            .into_iter()
            .map(|(category, (total, count))| CategoryTotal {
                category,
                total,
                count,
            })
            .collect();
        by_category.sort_by(|a, b| b.total.cmp(&a.total).then(a.category.cmp(&b.category)));

        let monthly = months
            .into_iter()
            .map(|(month, (total, count))| MonthlyTotal {
                month: month_label(month),
                total,
                count,
            })
            .collect();

        let mut by_event_type: Vec<EventTypeTotal> = event_type_totals.into_values().collect();
        by_event_type.sort_by(|a, b| {
            b.allocated
                .cmp(&a.allocated)
                .then_with(|| a.event_type.cmp(&b.event_type))
        });

        BudgetAnalytics {
            totals,
            by_category,
            monthly,
            by_event_type,
            pending_approvals: pending,
        }
    }
}

/// Spent as a percentage of allocated, rounded to 2 dp.
///
/// Returns zero when nothing is allocated and `Decimal::MAX` when the ratio
/// does not fit.
#[must_use]
pub fn utilization_percent(spent: Decimal, allocated: Decimal) -> Decimal {
    if allocated.is_zero() {
        return Decimal::ZERO;
    }
    spent
        .checked_div(allocated)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::MAX, |percent| percent.round_dp(2))
}

fn month_index(date: chrono::NaiveDate) -> i32 {
    // Month numbers are 1..=12, always fit.
    let month = i32::try_from(date.month0()).unwrap_or_default();
    date.year() * 12 + month
}

fn month_label(index: i32) -> String {
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) + 1;
    format!("{year:04}-{month:02}")
}

#[cfg(test)]
#[path = "aggregator_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "aggregator_props.rs"]
mod props;
