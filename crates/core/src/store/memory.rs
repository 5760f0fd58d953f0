//! Process-local store backed by concurrent maps.

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use eventledger_shared::types::{BudgetId, EventId, PageRequest, UserId};

use super::{
    ActorDirectory, BudgetQuery, BudgetStore, EventDirectory, EventRecord, StoreError,
};
use crate::budget::{Budget, BudgetDocument};

/// In-memory budgets, events and users.
///
/// The per-event index entry is held while a budget is inserted, so two
/// concurrent creates for one event cannot both succeed. Data is lost on
/// restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    budgets: DashMap<BudgetId, BudgetDocument>,
    active_by_event: DashMap<EventId, BudgetId>,
    events: DashMap<EventId, EventRecord>,
    users: DashMap<UserId, String>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an event.
    pub fn add_event(&self, id: EventId, title: &str, event_type: Option<&str>) {
        self.events.insert(
            id,
            EventRecord {
                id,
                title: title.to_string(),
                event_type: event_type.map(str::to_string),
                budget_id: None,
            },
        );
    }

    /// Registers a user display name.
    pub fn add_user(&self, id: UserId, name: &str) {
        self.users.insert(id, name.to_string());
    }

    /// Returns a copy of an event record.
    #[must_use]
    pub fn event(&self, id: EventId) -> Option<EventRecord> {
        self.events.get(&id).map(|e| e.clone())
    }

    /// Overwrites an event's back-reference without any checks.
    pub fn force_event_link(&self, id: EventId, budget_id: Option<BudgetId>) {
        if let Some(mut event) = self.events.get_mut(&id) {
            event.budget_id = budget_id;
        }
    }
}

#[async_trait]
impl BudgetStore for InMemoryStore {
    async fn insert(&self, budget: &Budget) -> Result<(), StoreError> {
        let doc = budget.to_document();
        match self.active_by_event.entry(doc.event_id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateActive(doc.event_id)),
            Entry::Vacant(slot) => {
                slot.insert(doc.id);
                self.budgets.insert(doc.id, doc);
                Ok(())
            }
        }
    }

    async fn find(&self, id: BudgetId) -> Result<Option<Budget>, StoreError> {
        Ok(self.budgets.get(&id).map(|doc| Budget::from(doc.clone())))
    }

    async fn find_active_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Budget>, StoreError> {
        let Some(id) = self.active_by_event.get(&event_id).map(|id| *id) else {
            return Ok(None);
        };
        self.find(id).await
    }

    async fn replace(&self, budget: &Budget) -> Result<Budget, StoreError> {
        let mut doc = budget.to_document();
        let expected = doc.version;
        {
            let mut stored = self
                .budgets
                .get_mut(&doc.id)
                .ok_or(StoreError::NotFound(doc.id))?;
            if stored.version != expected {
                return Err(StoreError::VersionConflict {
                    budget_id: doc.id,
                    expected,
                });
            }
            doc.version = expected + 1;
            *stored = doc.clone();
        }

        if !doc.is_active {
            self.active_by_event
                .remove_if(&doc.event_id, |_, active| *active == doc.id);
        }
        Ok(Budget::from(doc))
    }

    async fn list(
        &self,
        query: &BudgetQuery,
        page: PageRequest,
    ) -> Result<(Vec<Budget>, u64), StoreError> {
        let mut matches: Vec<BudgetDocument> = self
            .budgets
            .iter()
            .filter(|doc| doc.is_active)
            .filter(|doc| query.status.is_none_or(|s| doc.status == s))
            .filter(|doc| {
                query
                    .event_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&doc.event_id))
            })
            .map(|doc| doc.clone())
            .collect();
        matches.sort_by_key(|doc| (Reverse(doc.created_at), Reverse(doc.id)));

        let total = matches.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(Budget::from)
            .collect();
        Ok((items, total))
    }

    async fn all_active(&self) -> Result<Vec<Budget>, StoreError> {
        Ok(self
            .budgets
            .iter()
            .filter(|doc| doc.is_active)
            .map(|doc| Budget::from(doc.clone()))
            .collect())
    }
}

#[async_trait]
impl EventDirectory for InMemoryStore {
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(self.event(id))
    }

    async fn search_titles(&self, needle: &str) -> Result<Vec<EventId>, StoreError> {
        let needle = needle.trim().to_lowercase();
        Ok(self
            .events
            .iter()
            .filter(|e| e.title.to_lowercase().contains(&needle))
            .map(|e| e.id)
            .collect())
    }

    async fn event_types(
        &self,
        ids: &[EventId],
    ) -> Result<HashMap<EventId, Option<String>>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.events.get(id).map(|e| (*id, e.event_type.clone())))
            .collect())
    }

    async fn link_budget(&self, event_id: EventId, budget_id: BudgetId) -> Result<(), StoreError> {
        let mut event = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::Backend(format!("event {event_id} disappeared")))?;
        event.budget_id = Some(budget_id);
        Ok(())
    }

    async fn unlink_budget(
        &self,
        event_id: EventId,
        budget_id: BudgetId,
    ) -> Result<bool, StoreError> {
        Ok(match self.events.get_mut(&event_id) {
            Some(mut event) if event.budget_id == Some(budget_id) => {
                event.budget_id = None;
                true
            }
            _ => false,
        })
    }

    async fn linked_events(&self) -> Result<Vec<(EventId, BudgetId)>, StoreError> {
        Ok(self
            .events
            .iter()
            .filter_map(|e| e.budget_id.map(|b| (e.id, b)))
            .collect())
    }
}

#[async_trait]
impl ActorDirectory for InMemoryStore {
    async fn display_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|name| (*id, name.clone())))
            .collect())
    }
}
