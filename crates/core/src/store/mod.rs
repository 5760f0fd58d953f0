//! Persistence seams.
//!
//! The ledger talks to storage only through these traits. PostgreSQL
//! implementations live in the `eventledger-db` crate; [`InMemoryStore`]
//! implements all three for tests and single-process deployments.

pub mod memory;

pub use memory::InMemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use eventledger_shared::types::{BudgetId, EventId, PageRequest, UserId};

use crate::budget::{Budget, BudgetStatus};

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another active budget already exists for the event.
    #[error("Event {0} already has an active budget")]
    DuplicateActive(EventId),

    /// The stored version moved since the budget was loaded.
    #[error("Budget {budget_id} was modified concurrently (expected version {expected})")]
    VersionConflict {
        /// Budget being written.
        budget_id: BudgetId,
        /// Version the writer loaded.
        expected: i64,
    },

    /// The budget does not exist.
    #[error("Budget not found: {0}")]
    NotFound(BudgetId),

    /// Backend failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if re-reading and retrying may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// Filter for listing active budgets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetQuery {
    /// Only budgets in this status.
    pub status: Option<BudgetStatus>,
    /// Only budgets for these events. `Some(vec![])` matches nothing.
    pub event_ids: Option<Vec<EventId>>,
}

/// Budget persistence.
#[async_trait]
pub trait BudgetStore: Send + Sync {
    /// Inserts a new active budget.
    ///
    /// Fails with `DuplicateActive` if the event already has one; the check
    /// and the insert are atomic.
    async fn insert(&self, budget: &Budget) -> Result<(), StoreError>;

    /// Loads a budget, active or not.
    async fn find(&self, id: BudgetId) -> Result<Option<Budget>, StoreError>;

    /// Loads the active budget for an event.
    async fn find_active_for_event(&self, event_id: EventId)
    -> Result<Option<Budget>, StoreError>;

    /// Writes `budget` if the stored version still equals `budget.version()`.
    ///
    /// Returns the budget as stored, with its version incremented.
    async fn replace(&self, budget: &Budget) -> Result<Budget, StoreError>;

    /// Lists active budgets, newest first, with the total match count.
    async fn list(
        &self,
        query: &BudgetQuery,
        page: PageRequest,
    ) -> Result<(Vec<Budget>, u64), StoreError>;

    /// Every active budget.
    async fn all_active(&self) -> Result<Vec<Budget>, StoreError>;
}

/// An event as the ledger sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event ID.
    pub id: EventId,
    /// Event title.
    pub title: String,
    /// Event type (workshop, conference, ...).
    pub event_type: Option<String>,
    /// Back-reference to the event's active budget.
    pub budget_id: Option<BudgetId>,
}

/// Access to the platform's event records.
#[async_trait]
pub trait EventDirectory: Send + Sync {
    /// Loads an event.
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>, StoreError>;

    /// Ids of events whose title contains `needle`, case-insensitively.
    async fn search_titles(&self, needle: &str) -> Result<Vec<EventId>, StoreError>;

    /// Event type for each id that exists.
    async fn event_types(
        &self,
        ids: &[EventId],
    ) -> Result<HashMap<EventId, Option<String>>, StoreError>;

    /// Points the event's budget back-reference at `budget_id`.
    async fn link_budget(&self, event_id: EventId, budget_id: BudgetId)
    -> Result<(), StoreError>;

    /// Clears the back-reference if it still points at `budget_id`.
    ///
    /// Returns true if a reference was cleared.
    async fn unlink_budget(
        &self,
        event_id: EventId,
        budget_id: BudgetId,
    ) -> Result<bool, StoreError>;

    /// Every event that currently carries a back-reference.
    async fn linked_events(&self) -> Result<Vec<(EventId, BudgetId)>, StoreError>;
}

/// Access to user display names.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Display names for the ids that exist.
    async fn display_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError>;
}
