//! Ledger operations.
//!
//! Each service method follows the same path: authorize the actor, validate
//! the payload, load the budget, mutate it, and persist it with a versioned
//! compare-and-swap. A lost race reloads and reapplies the mutation up to
//! `max_write_attempts` times.

pub mod analytics;
pub mod approval;
pub mod error;
pub mod export;
pub mod repository;

pub use analytics::AnalyticsService;
pub use approval::ApprovalWorkflow;
pub use error::LedgerError;
pub use export::{ExportService, ExportedDocument};
pub use repository::{BudgetRepository, ReconcileReport};

use std::sync::Arc;

use chrono_tz::Tz;
use tracing::{debug, warn};

use eventledger_shared::LedgerConfig;
use eventledger_shared::types::BudgetId;

use crate::analytics::AnalyticsAggregator;
use crate::budget::{Budget, BudgetError};
use crate::export::RendererRegistry;
use crate::store::{ActorDirectory, BudgetStore, EventDirectory, InMemoryStore};

/// Tunables for ledger services.
#[derive(Debug, Clone, Copy)]
pub struct LedgerSettings {
    /// Attempts per optimistic write.
    pub max_write_attempts: u32,
    /// Attempts to write an event back-reference.
    pub link_attempts: u32,
    /// Page size when none is requested.
    pub default_page_size: u32,
    /// Largest page size.
    pub max_page_size: u32,
    /// Timezone for monthly analytics buckets.
    pub timezone: Tz,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            max_write_attempts: 3,
            link_attempts: 3,
            default_page_size: 10,
            max_page_size: 100,
            timezone: Tz::UTC,
        }
    }
}

impl TryFrom<&LedgerConfig> for LedgerSettings {
    type Error = LedgerError;

    fn try_from(config: &LedgerConfig) -> Result<Self, Self::Error> {
        let timezone: Tz = config
            .timezone
            .parse()
            .map_err(|_| LedgerError::Settings(format!("unknown timezone '{}'", config.timezone)))?;
        Ok(Self {
            max_write_attempts: config.max_write_attempts.max(1),
            link_attempts: config.link_attempts.max(1),
            default_page_size: config.default_page_size.max(1),
            max_page_size: config.max_page_size.max(1),
            timezone,
        })
    }
}

/// Storage collaborators.
#[derive(Clone)]
pub struct LedgerStores {
    /// Budget persistence.
    pub budgets: Arc<dyn BudgetStore>,
    /// Event records.
    pub events: Arc<dyn EventDirectory>,
    /// User display names.
    pub actors: Arc<dyn ActorDirectory>,
}

impl LedgerStores {
    /// All three collaborators served by one in-memory store.
    #[must_use]
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            budgets: store.clone(),
            events: store.clone(),
            actors: store,
        }
    }
}

/// Every ledger service, wired to the same stores.
#[derive(Clone)]
pub struct Ledger {
    /// Budget lifecycle.
    pub repository: BudgetRepository,
    /// Expense submission and review.
    pub workflow: ApprovalWorkflow,
    /// Cross-event analytics.
    pub analytics: AnalyticsService,
    /// Budget export documents.
    pub exports: ExportService,
}

impl Ledger {
    /// Wires the services.
    #[must_use]
    pub fn new(stores: &LedgerStores, settings: LedgerSettings, renderers: RendererRegistry) -> Self {
        Self {
            repository: BudgetRepository::new(
                stores.budgets.clone(),
                stores.events.clone(),
                settings,
            ),
            workflow: ApprovalWorkflow::new(stores.budgets.clone(), settings),
            analytics: AnalyticsService::new(
                stores.budgets.clone(),
                stores.events.clone(),
                AnalyticsAggregator::new(settings.timezone),
            ),
            exports: ExportService::new(
                stores.budgets.clone(),
                stores.events.clone(),
                stores.actors.clone(),
                renderers,
            ),
        }
    }
}

/// Loads a budget that has not been soft-deleted.
pub(crate) async fn load_active(
    store: &dyn BudgetStore,
    id: BudgetId,
) -> Result<Budget, LedgerError> {
    match store.find(id).await? {
        Some(budget) if budget.is_active() => Ok(budget),
        _ => Err(BudgetError::NotFound(id).into()),
    }
}

/// Applies `mutate` to `budget` and persists it with compare-and-swap.
///
/// On a version conflict the budget is reloaded and `mutate` runs again, up
/// to `max_attempts` writes in total.
pub(crate) async fn write_with_retry<T, F>(
    store: &dyn BudgetStore,
    mut budget: Budget,
    max_attempts: u32,
    mut mutate: F,
) -> Result<(Budget, T), LedgerError>
where
    F: FnMut(&mut Budget) -> Result<T, LedgerError> + Send,
    T: Send,
{
    let budget_id = budget.id();
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        let output = mutate(&mut budget)?;
        match store.replace(&budget).await {
            Ok(stored) => return Ok((stored, output)),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                debug!(%budget_id, attempt, "version conflict, reloading budget");
                attempt += 1;
                budget = load_active(store, budget_id).await?;
            }
            Err(err) if err.is_retryable() => {
                warn!(%budget_id, attempts = max_attempts, "giving up after repeated version conflicts");
                return Err(LedgerError::ConcurrentModification {
                    budget_id,
                    attempts: max_attempts,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests;
