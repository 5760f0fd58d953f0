//! Property-based tests for analytics rollups.
//!
//! - Category totals add up to total spent
//! - Monthly totals never exceed total spent
//! - Utilization is zero exactly when nothing is allocated or spent

use chrono::{Duration, TimeZone};
use proptest::prelude::*;

use eventledger_shared::types::UserId;

use super::*;
use crate::budget::{NewBudget, NewExpense};
use crate::workflow::WorkflowService;

fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn entry() -> impl Strategy<Value = (ExpenseCategory, Decimal, i64, ExpenseStatus)> {
    (
        proptest::sample::select(ExpenseCategory::ALL.to_vec()),
        amount(),
        0i64..800,
        proptest::sample::select(ExpenseStatus::ALL.to_vec()),
    )
}

fn budget_strategy() -> impl Strategy<Value = (Decimal, Vec<(ExpenseCategory, Decimal, i64, ExpenseStatus)>)>
{
    (amount(), prop::collection::vec(entry(), 0..8))
}

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap()
}

fn build(total: Decimal, entries: Vec<(ExpenseCategory, Decimal, i64, ExpenseStatus)>) -> Budget {
    let mut budget = Budget::open(
        NewBudget {
            event_id: EventId::new(),
            total_amount: total,
            notes: None,
        },
        UserId::new(),
        as_of(),
    );
    for (category, amount, days_ago, status) in entries {
        let id = budget.add_expense(
            NewExpense {
                category,
                amount,
                description: "x".to_string(),
                receipt: "r".to_string(),
                date: Some(as_of() - Duration::days(days_ago)),
                notes: None,
            },
            UserId::new(),
            as_of(),
        );
        let action = WorkflowService::review(status, UserId::new(), as_of(), None);
        budget.review_expense(id, action).unwrap();
    }
    budget
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_rollups_are_consistent(
        specs in prop::collection::vec(budget_strategy(), 0..6),
    ) {
        let budgets: Vec<Budget> = specs.into_iter().map(|(t, e)| build(t, e)).collect();
        let result = AnalyticsAggregator::default().summarize(&budgets, &HashMap::new(), as_of());

        let category_sum: Decimal = result.by_category.iter().map(|c| c.total).sum();
        prop_assert_eq!(category_sum, result.totals.total_spent);

        let monthly_sum: Decimal = result.monthly.iter().map(|m| m.total).sum();
        prop_assert!(monthly_sum <= result.totals.total_spent);
        prop_assert!(result.monthly.len() <= 12);
        prop_assert!(result.monthly.windows(2).all(|w| w[0].month < w[1].month));

        let allocated_sum: Decimal = result.by_event_type.iter().map(|g| g.allocated).sum();
        prop_assert_eq!(allocated_sum, result.totals.total_allocated);

        if result.totals.total_allocated.is_zero() {
            prop_assert_eq!(result.totals.utilization_percent, Decimal::ZERO);
        }
    }
}
