//! Cross-event analytics.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use eventledger_shared::types::EventId;

use super::LedgerError;
use crate::analytics::{AnalyticsAggregator, BudgetAnalytics};
use crate::policy::{Action, Actor, AuthorizationPolicy, Ownership};
use crate::store::{BudgetStore, EventDirectory};

/// Summarizes every active budget.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn BudgetStore>,
    events: Arc<dyn EventDirectory>,
    aggregator: AnalyticsAggregator,
}

impl AnalyticsService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        store: Arc<dyn BudgetStore>,
        events: Arc<dyn EventDirectory>,
        aggregator: AnalyticsAggregator,
    ) -> Self {
        Self {
            store,
            events,
            aggregator,
        }
    }

    /// Computes analytics as of now.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for members or a storage error.
    pub async fn summarize(&self, actor: &Actor) -> Result<BudgetAnalytics, LedgerError> {
        AuthorizationPolicy::authorize(actor, Action::ViewAnalytics, &Ownership::none())?;

        let budgets = self.store.all_active().await?;
        let mut event_ids: Vec<EventId> = budgets.iter().map(|b| b.event_id()).collect();
        event_ids.sort();
        event_ids.dedup();
        let event_types = self.events.event_types(&event_ids).await?;

        debug!(budgets = budgets.len(), events = event_ids.len(), "summarizing budgets");
        Ok(self.aggregator.summarize(&budgets, &event_types, Utc::now()))
    }
}
