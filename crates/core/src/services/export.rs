//! Budget export documents.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::info;

use eventledger_shared::types::BudgetId;

use super::{LedgerError, load_active};
use crate::budget::ValidationErrors;
use crate::export::{BudgetSnapshot, ExportFormat, RendererRegistry};
use crate::policy::{Action, Actor, AuthorizationPolicy, Ownership};
use crate::store::{ActorDirectory, BudgetStore, EventDirectory};

/// A rendered document ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    /// Suggested download name.
    pub filename: String,
    /// MIME type.
    pub content_type: &'static str,
    /// Document bytes.
    pub body: Bytes,
}

/// Renders budgets with names resolved.
#[derive(Clone)]
pub struct ExportService {
    store: Arc<dyn BudgetStore>,
    events: Arc<dyn EventDirectory>,
    actors: Arc<dyn ActorDirectory>,
    registry: RendererRegistry,
}

impl ExportService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn BudgetStore>,
        events: Arc<dyn EventDirectory>,
        actors: Arc<dyn ActorDirectory>,
        registry: RendererRegistry,
    ) -> Self {
        Self {
            store,
            events,
            actors,
            registry,
        }
    }

    /// Exports a budget in `format` (`json`, `csv`, `pdf`, `xlsx`).
    ///
    /// # Errors
    ///
    /// - `Forbidden` if the actor may not export
    /// - `Validation` for an unknown format name
    /// - `Render(Unsupported)` if no renderer is registered for the format
    /// - `Budget(NotFound)` if the budget is missing or deleted
    pub async fn export(
        &self,
        budget_id: BudgetId,
        format: &str,
        actor: &Actor,
    ) -> Result<ExportedDocument, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::ExportBudget, &Ownership::none())?;
        let format = ExportFormat::parse(format)
            .ok_or_else(|| ValidationErrors::single("format", "must be one of json, csv, pdf, xlsx"))?;
        let renderer = self.registry.get(format)?.clone();

        let budget = load_active(self.store.as_ref(), budget_id).await?;
        let event_title = self
            .events
            .find_event(budget.event_id())
            .await?
            .map(|event| event.title);
        let names = self
            .actors
            .display_names(&BudgetSnapshot::user_ids(&budget))
            .await?;

        let snapshot = BudgetSnapshot::new(&budget, event_title, &names, Utc::now());
        let body = renderer.render(&snapshot)?;
        info!(%budget_id, %format, bytes = body.len(), actor_id = %actor.id, "budget exported");

        Ok(ExportedDocument {
            filename: format!("budget-{budget_id}.{}", format.extension()),
            content_type: format.content_type(),
            body,
        })
    }
}
