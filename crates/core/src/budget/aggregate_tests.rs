use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use eventledger_shared::types::{EventId, ExpenseId, UserId};

use super::*;
use crate::budget::types::ExpenseCategory;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, 0).unwrap()
}

fn budget(total: Decimal) -> Budget {
    Budget::open(
        NewBudget {
            event_id: EventId::new(),
            total_amount: total,
            notes: None,
        },
        UserId::new(),
        now(),
    )
}

fn expense(category: ExpenseCategory, amount: Decimal) -> NewExpense {
    NewExpense {
        category,
        amount,
        description: "Hall rental".to_string(),
        receipt: "receipts/1.pdf".to_string(),
        date: None,
        notes: None,
    }
}

fn approve(budget: &mut Budget, id: ExpenseId, approver: UserId) {
    let action = WorkflowService::review(ExpenseStatus::Approved, approver, now(), None);
    budget.review_expense(id, action).unwrap();
}

#[test]
fn test_open_budget_is_empty_and_active() {
    let b = budget(dec!(1000));
    assert!(b.is_active());
    assert_eq!(b.status(), BudgetStatus::Active);
    assert_eq!(b.spent_amount(), Decimal::ZERO);
    assert_eq!(b.remaining_amount(), dec!(1000));
    assert!(b.expenses().is_empty());
    assert_eq!(b.version(), 0);
}

#[test]
fn test_new_expense_is_pending_and_dated_now() {
    let mut b = budget(dec!(1000));
    let payer = UserId::new();
    let id = b.add_expense(expense(ExpenseCategory::Food, dec!(45.50)), payer, now());

    let entry = b.expense(id).unwrap();
    assert_eq!(entry.status, ExpenseStatus::Pending);
    assert_eq!(entry.paid_by, payer);
    assert_eq!(entry.date, now());
    assert_eq!(b.spent_amount(), Decimal::ZERO);
}

#[test]
fn test_approve_edit_reapprove_scenario() {
    let admin = UserId::new();
    let mut b = budget(dec!(1000));
    let id = b.add_expense(
        expense(ExpenseCategory::Venue, dec!(300)),
        UserId::new(),
        now(),
    );
    assert_eq!(b.spent_amount(), dec!(0));

    approve(&mut b, id, admin);
    assert_eq!(b.spent_amount(), dec!(300));

    let patch = ExpensePatch {
        amount: Some(dec!(500)),
        ..ExpensePatch::default()
    };
    b.update_expense(id, &patch, now()).unwrap();
    let entry = b.expense(id).unwrap();
    assert_eq!(entry.status, ExpenseStatus::Pending);
    assert!(entry.reviewed_by.is_none());
    assert_eq!(b.spent_amount(), dec!(0));

    approve(&mut b, id, admin);
    assert_eq!(b.spent_amount(), dec!(500));
}

#[test]
fn test_resubmitting_same_amount_resets_approval() {
    let mut b = budget(dec!(1000));
    let id = b.add_expense(
        expense(ExpenseCategory::Venue, dec!(300)),
        UserId::new(),
        now(),
    );
    approve(&mut b, id, UserId::new());

    let patch = ExpensePatch {
        amount: Some(dec!(300)),
        category: Some(ExpenseCategory::Venue),
        ..ExpensePatch::default()
    };
    b.update_expense(id, &patch, now()).unwrap();
    let entry = b.expense(id).unwrap();
    assert_eq!(entry.status, ExpenseStatus::Pending);
    assert!(entry.reviewed_at.is_none());
    assert_eq!(b.spent_amount(), Decimal::ZERO);
}

#[test]
fn test_description_edit_keeps_approval() {
    let mut b = budget(dec!(1000));
    let id = b.add_expense(
        expense(ExpenseCategory::Venue, dec!(300)),
        UserId::new(),
        now(),
    );
    approve(&mut b, id, UserId::new());

    let patch = ExpensePatch {
        description: Some("Main hall".to_string()),
        ..ExpensePatch::default()
    };
    b.update_expense(id, &patch, now()).unwrap();
    assert_eq!(b.expense(id).unwrap().status, ExpenseStatus::Approved);
    assert_eq!(b.spent_amount(), dec!(300));
}

#[test]
fn test_repeated_approval_is_idempotent() {
    let admin = UserId::new();
    let mut b = budget(dec!(1000));
    let id = b.add_expense(
        expense(ExpenseCategory::Materials, dec!(120)),
        UserId::new(),
        now(),
    );
    approve(&mut b, id, admin);
    let first = b.clone();
    approve(&mut b, id, admin);
    assert_eq!(b, first);
}

#[test]
fn test_review_notes_replace_only_when_supplied() {
    let mut b = budget(dec!(1000));
    let id = b.add_expense(
        expense(ExpenseCategory::Speaker, dec!(200)),
        UserId::new(),
        now(),
    );
    let with_notes = WorkflowService::review(
        ExpenseStatus::Rejected,
        UserId::new(),
        now(),
        Some("missing receipt".to_string()),
    );
    b.review_expense(id, with_notes).unwrap();

    let without = WorkflowService::review(ExpenseStatus::Rejected, UserId::new(), now(), None);
    b.review_expense(id, without).unwrap();
    assert_eq!(b.expense(id).unwrap().notes.as_deref(), Some("missing receipt"));
}

#[test]
fn test_remove_approved_expense_reduces_spend() {
    let mut b = budget(dec!(1000));
    let keep = b.add_expense(
        expense(ExpenseCategory::Food, dec!(80)),
        UserId::new(),
        now(),
    );
    let gone = b.add_expense(
        expense(ExpenseCategory::Marketing, dec!(20)),
        UserId::new(),
        now(),
    );
    approve(&mut b, keep, UserId::new());
    approve(&mut b, gone, UserId::new());
    assert_eq!(b.spent_amount(), dec!(100));

    let removed = b.remove_expense(gone, now()).unwrap();
    assert_eq!(removed.id, gone);
    assert_eq!(b.spent_amount(), dec!(80));
    assert_eq!(b.expenses().len(), 1);
}

#[test]
fn test_unknown_expense_is_not_found() {
    let mut b = budget(dec!(1000));
    let missing = ExpenseId::new();
    let err = b.remove_expense(missing, now()).unwrap_err();
    assert_eq!(
        err,
        BudgetError::ExpenseNotFound {
            budget_id: b.id(),
            expense_id: missing
        }
    );
}

#[test]
fn test_overspend_is_allowed() {
    let mut b = budget(dec!(100));
    let id = b.add_expense(
        expense(ExpenseCategory::Venue, dec!(250)),
        UserId::new(),
        now(),
    );
    approve(&mut b, id, UserId::new());
    assert_eq!(b.remaining_amount(), dec!(-150));
}

#[test]
fn test_patch_updates_fields_and_timestamp() {
    let mut b = budget(dec!(1000));
    let later = now() + Duration::hours(1);
    b.apply_patch(
        &BudgetPatch {
            total_amount: Some(dec!(1500)),
            status: Some(BudgetStatus::Closed),
            notes: Some(Some("final".to_string())),
        },
        later,
    );
    assert_eq!(b.total_amount(), dec!(1500));
    assert_eq!(b.status(), BudgetStatus::Closed);
    assert_eq!(b.notes(), Some("final"));
    assert_eq!(b.updated_at(), later);
    assert_eq!(b.created_at(), now());
}

#[test]
fn test_deactivate_twice_reports_no_change() {
    let mut b = budget(dec!(1000));
    assert!(b.deactivate(now()));
    assert!(!b.deactivate(now()));
    assert!(!b.is_active());
}

#[test]
fn test_document_preserves_order_and_recomputes_spend() {
    let mut b = budget(dec!(1000));
    let ids: Vec<ExpenseId> = (1..=4)
        .map(|i| {
            b.add_expense(
                expense(ExpenseCategory::Other, Decimal::from(i)),
                UserId::new(),
                now(),
            )
        })
        .collect();
    approve(&mut b, ids[2], UserId::new());

    let mut doc = b.to_document();
    let order: Vec<ExpenseId> = doc.expenses.iter().map(|e| e.id).collect();
    assert_eq!(order, ids);

    // A stale stored total is ignored on load.
    doc.spent_amount = dec!(9999);
    let reloaded = Budget::from(doc);
    assert_eq!(reloaded.spent_amount(), dec!(3));
}

#[test]
fn test_serde_goes_through_document() {
    let mut b = budget(dec!(1000));
    b.add_expense(
        expense(ExpenseCategory::Venue, dec!(300)),
        UserId::new(),
        now(),
    );
    let json = serde_json::to_value(&b).unwrap();
    assert_eq!(json["status"], "active");
    assert_eq!(json["expenses"][0]["status"], "pending");
    assert_eq!(json["expenses"][0]["category"], "venue");

    let back: Budget = serde_json::from_value(json).unwrap();
    assert_eq!(back, b);
}

#[test]
fn test_approval_past_max_spend_is_rejected() {
    let mut b = budget(dec!(1000));
    let admin = UserId::new();
    let full = b.add_expense(expense(ExpenseCategory::Venue, MAX_AMOUNT), UserId::new(), now());
    approve(&mut b, full, admin);
    assert_eq!(b.spent_amount(), MAX_AMOUNT);

    let huge = Decimal::from_i128_with_scale(60_000_000_000_000_000_000_000_000_000, 0);
    for amount in [dec!(0.0001), huge] {
        let id = b.add_expense(expense(ExpenseCategory::Other, amount), UserId::new(), now());
        let action = WorkflowService::review(ExpenseStatus::Approved, admin, now(), None);
        let err = b.review_expense(id, action).unwrap_err();
        assert!(matches!(err, BudgetError::SpendOutOfRange { expense_id, .. } if expense_id == id));
        assert_eq!(b.expense(id).unwrap().status, ExpenseStatus::Pending);
    }
    assert_eq!(b.spent_amount(), MAX_AMOUNT);

    // Rejecting never adds to spend.
    let rejected = b.expenses().iter().last().map(|e| e.id).unwrap();
    let action = WorkflowService::review(ExpenseStatus::Rejected, admin, now(), None);
    assert!(b.review_expense(rejected, action).unwrap());
}

#[test]
fn test_unrepresentable_stored_spend_falls_back_to_stored_total() {
    let mut b = budget(dec!(1000));
    let huge = Decimal::from_i128_with_scale(60_000_000_000_000_000_000_000_000_000, 0);
    for _ in 0..2 {
        b.add_expense(expense(ExpenseCategory::Other, huge), UserId::new(), now());
    }
    let mut doc = b.to_document();
    for entry in &mut doc.expenses {
        entry.status = ExpenseStatus::Approved;
    }
    doc.spent_amount = dec!(42);

    let reloaded = Budget::from(doc);
    assert_eq!(reloaded.expenses().approved_total(), None);
    assert_eq!(reloaded.spent_amount(), dec!(42));
}
