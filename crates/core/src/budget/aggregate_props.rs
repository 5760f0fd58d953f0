//! Property-based tests for the budget aggregate.
//!
//! - Spent amount always equals the sum of approved entry amounts
//! - Loading a persisted document reproduces the same aggregate

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use eventledger_shared::types::{EventId, UserId};

use super::*;
use crate::budget::types::ExpenseCategory;

/// Strategy to generate non-negative amounts (0.00 to 10,000.00).
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn category() -> impl Strategy<Value = ExpenseCategory> {
    proptest::sample::select(ExpenseCategory::ALL.to_vec())
}

fn status() -> impl Strategy<Value = ExpenseStatus> {
    proptest::sample::select(ExpenseStatus::ALL.to_vec())
}

/// One mutation; `usize` picks an existing entry by position.
#[derive(Debug, Clone)]
enum Op {
    Add(ExpenseCategory, Decimal),
    Review(usize, ExpenseStatus),
    EditAmount(usize, Decimal),
    EditCategory(usize, ExpenseCategory),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (category(), amount()).prop_map(|(c, a)| Op::Add(c, a)),
        3 => (any::<usize>(), status()).prop_map(|(i, s)| Op::Review(i, s)),
        1 => (any::<usize>(), amount()).prop_map(|(i, a)| Op::EditAmount(i, a)),
        1 => (any::<usize>(), category()).prop_map(|(i, c)| Op::EditCategory(i, c)),
        1 => any::<usize>().prop_map(Op::Remove),
    ]
}

fn pick(budget: &Budget, index: usize) -> Option<ExpenseId> {
    let len = budget.expenses().len();
    if len == 0 {
        return None;
    }
    budget.expenses().iter().nth(index % len).map(|e| e.id)
}

fn apply(budget: &mut Budget, op: Op) {
    let now = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
    match op {
        Op::Add(category, amount) => {
            budget.add_expense(
                NewExpense {
                    category,
                    amount,
                    description: "item".to_string(),
                    receipt: "r".to_string(),
                    date: None,
                    notes: None,
                },
                UserId::new(),
                now,
            );
        }
        Op::Review(i, status) => {
            if let Some(id) = pick(budget, i) {
                let action = WorkflowService::review(status, UserId::new(), now, None);
                budget.review_expense(id, action).unwrap();
            }
        }
        Op::EditAmount(i, amount) => {
            if let Some(id) = pick(budget, i) {
                let patch = ExpensePatch {
                    amount: Some(amount),
                    ..ExpensePatch::default()
                };
                budget.update_expense(id, &patch, now).unwrap();
            }
        }
        Op::EditCategory(i, category) => {
            if let Some(id) = pick(budget, i) {
                let patch = ExpensePatch {
                    category: Some(category),
                    ..ExpensePatch::default()
                };
                budget.update_expense(id, &patch, now).unwrap();
            }
        }
        Op::Remove(i) => {
            if let Some(id) = pick(budget, i) {
                budget.remove_expense(id, now).unwrap();
            }
        }
    }
}

fn approved_sum(budget: &Budget) -> Decimal {
    budget
        .expenses()
        .iter()
        .filter(|e| e.status == ExpenseStatus::Approved)
        .map(|e| e.amount)
        .sum()
}

fn fresh(total: Decimal) -> Budget {
    Budget::open(
        NewBudget {
            event_id: EventId::new(),
            total_amount: total,
            notes: None,
        },
        UserId::new(),
        Utc::now(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_spent_equals_approved_sum(
        total in amount(),
        ops in prop::collection::vec(op(), 0..40),
    ) {
        let mut budget = fresh(total);
        for op in ops {
            apply(&mut budget, op);
            prop_assert_eq!(budget.spent_amount(), approved_sum(&budget));
            prop_assert!(budget.spent_amount() >= Decimal::ZERO);
        }
    }

    #[test]
    fn prop_document_round_trip(
        ops in prop::collection::vec(op(), 0..20),
    ) {
        let mut budget = fresh(Decimal::ONE_THOUSAND);
        for op in ops {
            apply(&mut budget, op);
        }
        let reloaded = Budget::from(budget.to_document());
        prop_assert_eq!(reloaded, budget);
    }
}
