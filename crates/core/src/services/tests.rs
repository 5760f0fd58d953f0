use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

use eventledger_shared::types::{BudgetId, EventId, PageRequest, UserId};

use super::*;
use crate::budget::{BudgetForm, BudgetListForm, BudgetPatchForm, ExpenseForm, StatusForm};
use crate::export::RenderError;
use crate::policy::{Actor, Role};
use crate::store::{BudgetQuery, EventRecord, StoreError};
use crate::workflow::ExpenseStatus;

struct Fixture {
    ledger: Ledger,
    store: Arc<InMemoryStore>,
    event_id: EventId,
    admin: Actor,
    committee: Actor,
}

fn fixture_with(settings: LedgerSettings) -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let event_id = EventId::new();
    store.add_event(event_id, "Spring Hackathon", Some("workshop"));
    let admin = Actor::new(UserId::new(), Role::Admin);
    let committee = Actor::new(UserId::new(), Role::CommitteeMember);
    store.add_user(admin.id, "Ada Admin");
    store.add_user(committee.id, "Cai Committee");

    let ledger = Ledger::new(
        &LedgerStores::in_memory(store.clone()),
        settings,
        RendererRegistry::default(),
    );
    Fixture {
        ledger,
        store,
        event_id,
        admin,
        committee,
    }
}

fn fixture() -> Fixture {
    fixture_with(LedgerSettings::default())
}

fn budget_form(event_id: EventId, total: &str) -> BudgetForm {
    serde_json::from_value(json!({ "eventId": event_id.to_string(), "totalAmount": total })).unwrap()
}

fn expense_form(amount: u32) -> ExpenseForm {
    serde_json::from_value(json!({
        "category": "venue",
        "amount": amount,
        "description": "Hall rental",
        "receipt": "receipts/hall.pdf",
    }))
    .unwrap()
}

fn status_form(status: &str) -> StatusForm {
    serde_json::from_value(json!({ "status": status })).unwrap()
}

#[tokio::test]
async fn test_spend_follows_approvals() {
    let f = fixture();
    let budget = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap();
    let id = budget.id();
    let wf = &f.ledger.workflow;

    let (_, hall) = wf.add_expense(id, expense_form(300), &f.committee).await.unwrap();
    let (b, _) = wf.add_expense(id, expense_form(500), &f.committee).await.unwrap();
    assert_eq!(b.spent_amount(), Decimal::ZERO);

    let b = wf.set_status(id, hall, status_form("approved"), &f.admin).await.unwrap();
    assert_eq!(b.spent_amount(), dec!(300));
    assert_eq!(b.remaining_amount(), dec!(700));

    let b = wf.set_status(id, hall, status_form("rejected"), &f.admin).await.unwrap();
    assert_eq!(b.spent_amount(), Decimal::ZERO);
    assert_eq!(b.expenses().len(), 2);
}

#[tokio::test]
async fn test_repeated_approval_leaves_budget_unchanged() {
    let f = fixture();
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    let wf = &f.ledger.workflow;
    let (_, expense_id) = wf.add_expense(id, expense_form(300), &f.committee).await.unwrap();

    let first = wf.set_status(id, expense_id, status_form("approved"), &f.admin).await.unwrap();
    let second = wf.set_status(id, expense_id, status_form("approved"), &f.admin).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.spent_amount(), dec!(300));
}

#[tokio::test]
async fn test_one_active_budget_per_event() {
    let f = fixture();
    let repo = &f.ledger.repository;
    let first = repo.create(budget_form(f.event_id, "1000"), &f.committee).await.unwrap();

    let err = repo
        .create(budget_form(f.event_id, "500"), &f.committee)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Budget(BudgetError::ActiveBudgetExists(e)) if e == f.event_id));

    repo.soft_delete(first.id(), &f.committee).await.unwrap();
    let second = repo.create(budget_form(f.event_id, "500"), &f.committee).await.unwrap();
    assert_eq!(f.store.event(f.event_id).unwrap().budget_id, Some(second.id()));
}

#[tokio::test]
async fn test_create_for_missing_event_is_not_found() {
    let f = fixture();
    let err = f
        .ledger
        .repository
        .create(budget_form(EventId::new(), "100"), &f.committee)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.error_code(), "EVENT_NOT_FOUND");
}

#[tokio::test]
async fn test_members_cannot_create_budgets() {
    let f = fixture();
    let member = Actor::new(UserId::new(), Role::Member);
    let err = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "100"), &member)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn test_authorization_precedes_validation() {
    let f = fixture();
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    let (_, expense_id) = f
        .ledger
        .workflow
        .add_expense(id, expense_form(10), &f.committee)
        .await
        .unwrap();
    let outsider = Actor::new(UserId::new(), Role::CommitteeMember);

    let bad_patch: BudgetPatchForm =
        serde_json::from_value(json!({ "total_amount": "-5" })).unwrap();
    let err = f
        .ledger
        .repository
        .update_fields(id, bad_patch, &outsider)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));

    let err = f
        .ledger
        .workflow
        .set_status(id, expense_id, status_form("paid"), &outsider)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));

    let err = f
        .ledger
        .workflow
        .set_status(id, expense_id, status_form("paid"), &f.admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}

#[tokio::test]
async fn test_missing_expense_is_not_found_for_admin_only() {
    let f = fixture();
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    let stranger = Actor::new(UserId::new(), Role::Member);
    let missing = eventledger_shared::types::ExpenseId::new();

    let err = f
        .ledger
        .workflow
        .delete_expense(id, missing, &f.admin)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "EXPENSE_NOT_FOUND");

    let err = f
        .ledger
        .workflow
        .delete_expense(id, missing, &stranger)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn test_payer_may_edit_own_expense_and_edit_resets_review() {
    let f = fixture();
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    let payer = Actor::new(UserId::new(), Role::CommitteeMember);
    let wf = &f.ledger.workflow;
    let (_, expense_id) = wf.add_expense(id, expense_form(100), &payer).await.unwrap();
    wf.set_status(id, expense_id, status_form("approved"), &f.admin).await.unwrap();

    let patch = serde_json::from_value(json!({ "amount": 150 })).unwrap();
    let b = wf.update_expense(id, expense_id, patch, &payer).await.unwrap();
    let entry = b.expense(expense_id).unwrap();
    assert_eq!(entry.status, ExpenseStatus::Pending);
    assert_eq!(entry.amount, dec!(150));
    assert_eq!(b.spent_amount(), Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_all_persist() {
    let f = fixture_with(LedgerSettings {
        max_write_attempts: 16,
        ..LedgerSettings::default()
    });
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "10000"), &f.committee)
        .await
        .unwrap()
        .id();

    let tasks: Vec<_> = (1..=8)
        .map(|n| {
            let wf = f.ledger.workflow.clone();
            let actor = f.committee;
            tokio::spawn(async move { wf.add_expense(id, expense_form(n), &actor).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let budget = f.ledger.repository.get(id, &f.committee).await.unwrap();
    assert_eq!(budget.expenses().len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_for_one_event_have_one_winner() {
    let f = fixture();
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let repo = f.ledger.repository.clone();
            let actor = f.committee;
            let form = budget_form(f.event_id, "1000");
            tokio::spawn(async move { repo.create(form, &actor).await })
        })
        .collect();

    let mut winners = Vec::new();
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(budget) => winners.push(budget.id()),
            Err(err) => assert!(
                matches!(err, LedgerError::Budget(BudgetError::ActiveBudgetExists(e)) if e == f.event_id),
                "unexpected error: {err}"
            ),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(f.store.event(f.event_id).unwrap().budget_id, Some(winners[0]));

    let form: BudgetListForm =
        serde_json::from_value(json!({ "eventId": f.event_id.to_string() })).unwrap();
    let page = f.ledger.repository.list(form, &f.committee).await.unwrap();
    assert_eq!(page.meta.total, 1);
}

#[tokio::test]
async fn test_out_of_range_amounts_are_rejected_before_writing() {
    let f = fixture();
    let repo = &f.ledger.repository;
    let err = repo
        .create(budget_form(f.event_id, "60000000000000000000000000000"), &f.committee)
        .await
        .unwrap_err();
    assert!(matches!(&err, LedgerError::Validation(v) if v.fields()[0].field == "total_amount"));

    let id = repo
        .create(budget_form(f.event_id, "0.0001"), &f.committee)
        .await
        .unwrap()
        .id();
    for amount in ["60000000000000000000000000000", "10000000000000000000000000", "5.00001"] {
        let form: ExpenseForm = serde_json::from_value(json!({
            "category": "venue",
            "amount": amount,
            "description": "Hall rental",
            "receipt": "receipts/hall.pdf",
        }))
        .unwrap();
        let err = f.ledger.workflow.add_expense(id, form, &f.committee).await.unwrap_err();
        assert!(matches!(&err, LedgerError::Validation(v) if v.fields()[0].field == "amount"));
    }

    let budget = repo.get(id, &f.committee).await.unwrap();
    assert!(budget.expenses().is_empty());
    assert_eq!(budget.version(), 0);

    let analytics = f.ledger.analytics.summarize(&f.admin).await.unwrap();
    assert_eq!(analytics.totals.utilization_percent, Decimal::ZERO);
}

/// Loses the first `conflicts` writes to a phantom concurrent writer.
struct ContendedStore {
    inner: Arc<InMemoryStore>,
    conflicts: AtomicU32,
}

#[async_trait]
impl BudgetStore for ContendedStore {
    async fn insert(&self, budget: &Budget) -> Result<(), StoreError> {
        self.inner.insert(budget).await
    }

    async fn find(&self, id: BudgetId) -> Result<Option<Budget>, StoreError> {
        self.inner.find(id).await
    }

    async fn find_active_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Budget>, StoreError> {
        self.inner.find_active_for_event(event_id).await
    }

    async fn replace(&self, budget: &Budget) -> Result<Budget, StoreError> {
        let lose = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            return Err(StoreError::VersionConflict {
                budget_id: budget.id(),
                expected: budget.version(),
            });
        }
        self.inner.replace(budget).await
    }

    async fn list(
        &self,
        query: &BudgetQuery,
        page: PageRequest,
    ) -> Result<(Vec<Budget>, u64), StoreError> {
        self.inner.list(query, page).await
    }

    async fn all_active(&self) -> Result<Vec<Budget>, StoreError> {
        self.inner.all_active().await
    }
}

fn contended(conflicts: u32) -> (Ledger, Arc<ContendedStore>, EventId, Actor) {
    let inner = Arc::new(InMemoryStore::new());
    let event_id = EventId::new();
    inner.add_event(event_id, "Gala", None);
    let budgets = Arc::new(ContendedStore {
        inner: inner.clone(),
        conflicts: AtomicU32::new(0),
    });
    let stores = LedgerStores {
        budgets: budgets.clone(),
        events: inner.clone(),
        actors: inner,
    };
    let ledger = Ledger::new(&stores, LedgerSettings::default(), RendererRegistry::default());
    budgets.conflicts.store(conflicts, Ordering::SeqCst);
    (ledger, budgets, event_id, Actor::new(UserId::new(), Role::Admin))
}

#[tokio::test]
async fn test_write_retries_after_version_conflicts() {
    let (ledger, store, event_id, admin) = contended(0);
    let id = ledger
        .repository
        .create(budget_form(event_id, "100"), &admin)
        .await
        .unwrap()
        .id();
    store.conflicts.store(2, Ordering::SeqCst);

    let (budget, _) = ledger.workflow.add_expense(id, expense_form(5), &admin).await.unwrap();
    assert_eq!(budget.expenses().len(), 1);
    assert_eq!(budget.version(), 1);
}

#[tokio::test]
async fn test_write_gives_up_after_max_attempts() {
    let (ledger, store, event_id, admin) = contended(0);
    let id = ledger
        .repository
        .create(budget_form(event_id, "100"), &admin)
        .await
        .unwrap()
        .id();
    store.conflicts.store(10, Ordering::SeqCst);

    let err = ledger
        .workflow
        .add_expense(id, expense_form(5), &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ConcurrentModification { attempts: 3, .. }));
    assert!(err.is_retryable());
    assert_eq!(err.status_code(), 409);
    assert!(store.inner.find(id).await.unwrap().unwrap().expenses().is_empty());
}

/// Event directory whose back-reference writes always fail.
struct BrokenLinks(Arc<InMemoryStore>);

#[async_trait]
impl EventDirectory for BrokenLinks {
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        self.0.find_event(id).await
    }

    async fn search_titles(&self, needle: &str) -> Result<Vec<EventId>, StoreError> {
        self.0.search_titles(needle).await
    }

    async fn event_types(
        &self,
        ids: &[EventId],
    ) -> Result<std::collections::HashMap<EventId, Option<String>>, StoreError> {
        self.0.event_types(ids).await
    }

    async fn link_budget(&self, _: EventId, _: BudgetId) -> Result<(), StoreError> {
        Err(StoreError::Backend("events collection unavailable".to_string()))
    }

    async fn unlink_budget(&self, event_id: EventId, budget_id: BudgetId) -> Result<bool, StoreError> {
        self.0.unlink_budget(event_id, budget_id).await
    }

    async fn linked_events(&self) -> Result<Vec<(EventId, BudgetId)>, StoreError> {
        self.0.linked_events().await
    }
}

#[tokio::test]
async fn test_failed_link_rolls_back_budget() {
    let store = Arc::new(InMemoryStore::new());
    let event_id = EventId::new();
    store.add_event(event_id, "Gala", None);
    let stores = LedgerStores {
        budgets: store.clone(),
        events: Arc::new(BrokenLinks(store.clone())),
        actors: store.clone(),
    };
    let settings = LedgerSettings {
        link_attempts: 2,
        ..LedgerSettings::default()
    };
    let ledger = Ledger::new(&stores, settings, RendererRegistry::default());
    let admin = Actor::new(UserId::new(), Role::Admin);

    let err = ledger
        .repository
        .create(budget_form(event_id, "100"), &admin)
        .await
        .unwrap_err();
    let LedgerError::LinkFailed { budget_id, .. } = err else {
        panic!("expected LinkFailed, got {err:?}");
    };
    assert_eq!(err.status_code(), 500);

    let stored = store.find(budget_id).await.unwrap().unwrap();
    assert!(!stored.is_active());
    assert!(store.find_active_for_event(event_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_soft_delete_hides_budget_and_is_idempotent() {
    let f = fixture();
    let repo = &f.ledger.repository;
    let id = repo
        .create(budget_form(f.event_id, "100"), &f.committee)
        .await
        .unwrap()
        .id();

    repo.soft_delete(id, &f.committee).await.unwrap();
    repo.soft_delete(id, &f.committee).await.unwrap();

    assert_eq!(f.store.event(f.event_id).unwrap().budget_id, None);
    let err = repo.get(id, &f.committee).await.unwrap_err();
    assert_eq!(err.error_code(), "BUDGET_NOT_FOUND");
    let err = f
        .ledger
        .workflow
        .add_expense(id, expense_form(1), &f.committee)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn test_reconcile_repairs_links() {
    let f = fixture();
    let repo = &f.ledger.repository;
    let id = repo
        .create(budget_form(f.event_id, "100"), &f.committee)
        .await
        .unwrap()
        .id();
    let orphan_event = EventId::new();
    f.store.add_event(orphan_event, "Retro", None);
    f.store.force_event_link(orphan_event, Some(BudgetId::new()));
    f.store.force_event_link(f.event_id, None);

    let report = repo.reconcile_event_links(&f.admin).await.unwrap();
    assert_eq!(report, ReconcileReport { cleared: 1, restored: 1 });
    assert_eq!(f.store.event(f.event_id).unwrap().budget_id, Some(id));
    assert_eq!(f.store.event(orphan_event).unwrap().budget_id, None);

    let again = repo.reconcile().await.unwrap();
    assert_eq!(again, ReconcileReport::default());

    let err = repo.reconcile_event_links(&f.committee).await.unwrap_err();
    assert!(matches!(err, LedgerError::Forbidden(_)));
}

#[tokio::test]
async fn test_list_filters_by_title_search() {
    let f = fixture();
    let other = EventId::new();
    f.store.add_event(other, "Autumn Meetup", Some("social"));
    let repo = &f.ledger.repository;
    repo.create(budget_form(f.event_id, "100"), &f.committee).await.unwrap();
    let meetup = repo.create(budget_form(other, "200"), &f.committee).await.unwrap();

    let form: BudgetListForm = serde_json::from_value(json!({ "search": "meetup" })).unwrap();
    let page = repo.list(form, &f.committee).await.unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].id(), meetup.id());

    let page = repo.list(BudgetListForm::default(), &f.committee).await.unwrap();
    assert_eq!(page.meta.total, 2);

    let form: BudgetListForm = serde_json::from_value(json!({ "search": "nothing" })).unwrap();
    let page = repo.list(form, &f.committee).await.unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn test_analytics_cover_active_budgets() {
    let f = fixture();
    let repo = &f.ledger.repository;
    let id = repo
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    let (_, e) = f.ledger.workflow.add_expense(id, expense_form(250), &f.committee).await.unwrap();
    f.ledger.workflow.set_status(id, e, status_form("approved"), &f.admin).await.unwrap();

    let analytics = f.ledger.analytics.summarize(&f.admin).await.unwrap();
    assert_eq!(analytics.totals.total_allocated, dec!(1000));
    assert_eq!(analytics.totals.total_spent, dec!(250));
    assert_eq!(analytics.by_event_type[0].event_type, "workshop");

    let member = Actor::new(UserId::new(), Role::Member);
    assert!(f.ledger.analytics.summarize(&member).await.is_err());
}

#[tokio::test]
async fn test_export_formats() {
    let f = fixture();
    let id = f
        .ledger
        .repository
        .create(budget_form(f.event_id, "1000"), &f.committee)
        .await
        .unwrap()
        .id();
    f.ledger.workflow.add_expense(id, expense_form(40), &f.committee).await.unwrap();
    let exports = &f.ledger.exports;

    let doc = exports.export(id, "csv", &f.admin).await.unwrap();
    assert_eq!(doc.content_type, "text/csv; charset=utf-8");
    assert_eq!(doc.filename, format!("budget-{id}.csv"));
    let text = String::from_utf8(doc.body.to_vec()).unwrap();
    assert!(text.contains("Cai Committee"));

    let doc = exports.export(id, "json", &f.admin).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&doc.body).unwrap();
    assert_eq!(value["event_title"], "Spring Hackathon");

    let err = exports.export(id, "pdf", &f.admin).await.unwrap_err();
    assert!(matches!(err, LedgerError::Render(RenderError::Unsupported(_))));

    let err = exports.export(id, "docx", &f.admin).await.unwrap_err();
    assert!(matches!(err, LedgerError::Validation(_)));
}
