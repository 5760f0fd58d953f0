//! Budget lifecycle: create, read, list, edit, soft-delete, and event link repair.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use eventledger_shared::types::{BudgetId, EventId, PageResponse};

use super::{LedgerError, LedgerSettings, load_active, write_with_retry};
use crate::budget::{
    Budget, BudgetError, BudgetForm, BudgetListForm, BudgetPatchForm,
};
use crate::policy::{Action, Actor, AuthorizationPolicy, Ownership};
use crate::store::{BudgetQuery, BudgetStore, EventDirectory, StoreError};

/// Outcome of an event link repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Dangling back-references removed.
    pub cleared: u64,
    /// Missing back-references written.
    pub restored: u64,
}

/// Budget persistence with the one-active-budget-per-event rule.
#[derive(Clone)]
pub struct BudgetRepository {
    store: Arc<dyn BudgetStore>,
    events: Arc<dyn EventDirectory>,
    settings: LedgerSettings,
}

impl BudgetRepository {
    /// Creates a repository.
    #[must_use]
    pub fn new(
        store: Arc<dyn BudgetStore>,
        events: Arc<dyn EventDirectory>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            store,
            events,
            settings,
        }
    }

    /// Creates a budget for an event and links the event back to it.
    ///
    /// If the back-reference cannot be written the new budget is
    /// deactivated before the error is returned.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor may not create budgets
    /// - `Validation` for an invalid payload
    /// - `Budget(EventNotFound)` if the event does not exist
    /// - `Budget(ActiveBudgetExists)` if the event already has an active budget
    /// - `LinkFailed` if the event could not be linked
    pub async fn create(&self, form: BudgetForm, actor: &Actor) -> Result<Budget, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::CreateBudget, &Ownership::none())?;
        let input = form.validate()?;

        let event_id = input.event_id;
        if self.events.find_event(event_id).await?.is_none() {
            return Err(BudgetError::EventNotFound(event_id).into());
        }

        let budget = Budget::open(input, actor.id, Utc::now());
        self.store.insert(&budget).await?;
        info!(budget_id = %budget.id(), %event_id, actor_id = %actor.id, "budget created");

        if let Err(err) = self.link_with_retry(event_id, budget.id()).await {
            warn!(budget_id = %budget.id(), %event_id, error = %err, "event link failed, rolling back budget");
            self.compensate(budget.clone()).await;
            return Err(LedgerError::LinkFailed {
                event_id,
                budget_id: budget.id(),
            });
        }

        Ok(budget)
    }

    /// Loads an active budget.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `Budget(NotFound)`.
    pub async fn get(&self, id: BudgetId, actor: &Actor) -> Result<Budget, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::ViewBudget, &Ownership::none())?;
        load_active(self.store.as_ref(), id).await
    }

    /// Lists active budgets, newest first.
    ///
    /// A title search is resolved to event ids first, then combined with
    /// the other filters.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or `Validation`.
    pub async fn list(
        &self,
        form: BudgetListForm,
        actor: &Actor,
    ) -> Result<PageResponse<Budget>, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::ListBudgets, &Ownership::none())?;
        let (filter, page) =
            form.validate(self.settings.default_page_size, self.settings.max_page_size)?;

        let mut event_ids: Option<Vec<EventId>> = filter.event_id.map(|id| vec![id]);
        if let Some(search) = &filter.search {
            let matching = self.events.search_titles(search).await?;
            event_ids = Some(match event_ids {
                Some(ids) => ids.into_iter().filter(|id| matching.contains(id)).collect(),
                None => matching,
            });
        }

        let query = BudgetQuery {
            status: filter.status,
            event_ids,
        };
        let (items, total) = self.store.list(&query, page).await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Edits `total_amount`, `status` and `notes`.
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden`, `Validation` or
    /// `ConcurrentModification`.
    pub async fn update_fields(
        &self,
        id: BudgetId,
        form: BudgetPatchForm,
        actor: &Actor,
    ) -> Result<Budget, LedgerError> {
        let budget = load_active(self.store.as_ref(), id).await?;
        AuthorizationPolicy::authorize(
            actor,
            Action::UpdateBudget,
            &Ownership::budget(budget.created_by()),
        )?;
        let patch = form.validate()?;

        let (stored, ()) = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| {
                b.apply_patch(&patch, Utc::now());
                Ok(())
            },
        )
        .await?;
        info!(budget_id = %id, actor_id = %actor.id, version = stored.version(), "budget updated");
        Ok(stored)
    }

    /// Soft-deletes a budget and clears its event back-reference.
    ///
    /// Deleting an already deleted budget succeeds without change. A failure
    /// to clear the back-reference is logged and left for
    /// [`Self::reconcile_event_links`].
    ///
    /// # Errors
    ///
    /// Returns `Budget(NotFound)`, `Forbidden` or `ConcurrentModification`.
    pub async fn soft_delete(&self, id: BudgetId, actor: &Actor) -> Result<(), LedgerError> {
        let budget = self
            .store
            .find(id)
            .await?
            .ok_or(BudgetError::NotFound(id))?;
        AuthorizationPolicy::authorize(
            actor,
            Action::DeleteBudget,
            &Ownership::budget(budget.created_by()),
        )?;
        if !budget.is_active() {
            return Ok(());
        }

        let event_id = budget.event_id();
        let result = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| Ok(b.deactivate(Utc::now())),
        )
        .await;
        match result {
            Ok(_) => {}
            // Someone else deleted it between our load and write.
            Err(LedgerError::Budget(BudgetError::NotFound(_))) => return Ok(()),
            Err(err) => return Err(err),
        }
        info!(budget_id = %id, %event_id, actor_id = %actor.id, "budget deleted");

        if let Err(err) = self.events.unlink_budget(event_id, id).await {
            warn!(budget_id = %id, %event_id, error = %err, "failed to clear event back-reference");
        }
        Ok(())
    }

    /// Runs the repair pass on behalf of an administrator.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` or a storage error.
    pub async fn reconcile_event_links(
        &self,
        actor: &Actor,
    ) -> Result<ReconcileReport, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::ReconcileLinks, &Ownership::none())?;
        self.reconcile().await
    }

    /// Clears back-references to missing or inactive budgets and restores
    /// missing references for active ones. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn reconcile(&self) -> Result<ReconcileReport, LedgerError> {
        let mut report = ReconcileReport::default();

        for (event_id, budget_id) in self.events.linked_events().await? {
            let valid = match self.store.find(budget_id).await? {
                Some(budget) => budget.is_active() && budget.event_id() == event_id,
                None => false,
            };
            if !valid && self.events.unlink_budget(event_id, budget_id).await? {
                report.cleared += 1;
            }
        }

        let mut seen = HashSet::new();
        for budget in self.store.all_active().await? {
            let event_id = budget.event_id();
            if !seen.insert(event_id) {
                continue;
            }
            match self.events.find_event(event_id).await? {
                Some(event) if event.budget_id == Some(budget.id()) => {}
                Some(_) => {
                    self.events.link_budget(event_id, budget.id()).await?;
                    report.restored += 1;
                }
                None => {
                    warn!(budget_id = %budget.id(), %event_id, "active budget references a missing event");
                }
            }
        }

        info!(cleared = report.cleared, restored = report.restored, "event links reconciled");
        Ok(report)
    }

    async fn link_with_retry(&self, event_id: EventId, budget_id: BudgetId) -> Result<(), StoreError> {
        let attempts = self.settings.link_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.events.link_budget(event_id, budget_id).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt < attempts => {
                    warn!(%budget_id, %event_id, attempt, error = %err, "event link attempt failed");
                    tokio::time::sleep(Duration::from_millis(25 * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn compensate(&self, budget: Budget) {
        let budget_id = budget.id();
        let result = write_with_retry(
            self.store.as_ref(),
            budget,
            self.settings.max_write_attempts,
            |b| Ok(b.deactivate(Utc::now())),
        )
        .await;
        if let Err(err) = result {
            error!(%budget_id, error = %err, "failed to deactivate unlinked budget");
        }
    }
}
