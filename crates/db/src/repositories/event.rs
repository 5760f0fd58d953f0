//! Event lookups and budget back-references.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use eventledger_core::store::{EventDirectory, EventRecord, StoreError};
use eventledger_shared::types::{BudgetId, EventId};

use super::backend;
use crate::entities::events;

/// Events stored in the `events` table.
#[derive(Debug, Clone)]
pub struct PgEventDirectory {
    db: DatabaseConnection,
}

impl PgEventDirectory {
    /// Creates a new event directory.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_record(model: events::Model) -> EventRecord {
    EventRecord {
        id: EventId::from_uuid(model.id),
        title: model.title,
        event_type: model.event_type,
        budget_id: model.budget_id.map(BudgetId::from_uuid),
    }
}

/// Builds a `LIKE` pattern matching `needle` anywhere, lowercased, with
/// wildcards in the needle escaped.
#[must_use]
pub fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.trim().to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl EventDirectory for PgEventDirectory {
    async fn find_event(&self, id: EventId) -> Result<Option<EventRecord>, StoreError> {
        Ok(events::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(to_record))
    }

    async fn search_titles(&self, needle: &str) -> Result<Vec<EventId>, StoreError> {
        let rows = events::Entity::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(events::Column::Title)))
                    .like(contains_pattern(needle)),
            )
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows.into_iter().map(|e| EventId::from_uuid(e.id)).collect())
    }

    async fn event_types(
        &self,
        ids: &[EventId],
    ) -> Result<HashMap<EventId, Option<String>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = events::Entity::find()
            .filter(events::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|e| (EventId::from_uuid(e.id), e.event_type))
            .collect())
    }

    async fn link_budget(&self, event_id: EventId, budget_id: BudgetId) -> Result<(), StoreError> {
        let result = events::Entity::update_many()
            .col_expr(events::Column::BudgetId, Expr::value(budget_id.into_inner()))
            .filter(events::Column::Id.eq(event_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(backend)?;
        if result.rows_affected == 0 {
            return Err(StoreError::Backend(format!("event {event_id} disappeared")));
        }
        Ok(())
    }

    async fn unlink_budget(
        &self,
        event_id: EventId,
        budget_id: BudgetId,
    ) -> Result<bool, StoreError> {
        let result = events::Entity::update_many()
            .col_expr(events::Column::BudgetId, Expr::value(Option::<Uuid>::None))
            .filter(events::Column::Id.eq(event_id.into_inner()))
            .filter(events::Column::BudgetId.eq(budget_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected > 0)
    }

    async fn linked_events(&self) -> Result<Vec<(EventId, BudgetId)>, StoreError> {
        let rows = events::Entity::find()
            .filter(events::Column::BudgetId.is_not_null())
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .filter_map(|e| {
                e.budget_id
                    .map(|b| (EventId::from_uuid(e.id), BudgetId::from_uuid(b)))
            })
            .collect())
    }
}
