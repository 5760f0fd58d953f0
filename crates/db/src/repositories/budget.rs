//! Budget persistence with versioned writes.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, NotSet,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use tracing::debug;

use eventledger_core::budget::{Budget, BudgetDocument, BudgetStatus, ExpenseEntry};
use eventledger_core::store::{BudgetQuery, BudgetStore, StoreError};
use eventledger_shared::types::{BudgetId, EventId, PageRequest, UserId};

use super::backend;
use crate::entities::budgets;

/// Budgets stored in the `budgets` table.
#[derive(Debug, Clone)]
pub struct PgBudgetStore {
    db: DatabaseConnection,
}

impl PgBudgetStore {
    /// Creates a new budget store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Converts a row into a document.
///
/// # Errors
///
/// Returns `StoreError::Backend` if the status or expense JSON is malformed.
pub fn to_document(model: budgets::Model) -> Result<BudgetDocument, StoreError> {
    let status = BudgetStatus::parse(&model.status).ok_or_else(|| {
        StoreError::Backend(format!(
            "budget {} has unknown status '{}'",
            model.id, model.status
        ))
    })?;
    let expenses: Vec<ExpenseEntry> = serde_json::from_value(model.expenses).map_err(|e| {
        StoreError::Backend(format!("budget {} has malformed expenses: {e}", model.id))
    })?;

    Ok(BudgetDocument {
        id: BudgetId::from_uuid(model.id),
        event_id: EventId::from_uuid(model.event_id),
        total_amount: model.total_amount.normalize(),
        spent_amount: model.spent_amount.normalize(),
        status,
        expenses,
        notes: model.notes,
        created_by: UserId::from_uuid(model.created_by),
        is_active: model.is_active,
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn to_active_model(doc: &BudgetDocument) -> Result<budgets::ActiveModel, StoreError> {
    let expenses = serde_json::to_value(&doc.expenses)
        .map_err(|e| StoreError::Backend(format!("failed to encode expenses: {e}")))?;
    Ok(budgets::ActiveModel {
        id: Set(doc.id.into_inner()),
        event_id: Set(doc.event_id.into_inner()),
        total_amount: Set(doc.total_amount),
        spent_amount: Set(doc.spent_amount),
        status: Set(doc.status.as_str().to_string()),
        expenses: Set(expenses),
        notes: Set(doc.notes.clone()),
        created_by: Set(doc.created_by.into_inner()),
        is_active: Set(doc.is_active),
        version: Set(doc.version),
        created_at: Set(doc.created_at.into()),
        updated_at: Set(doc.updated_at.into()),
    })
}

fn to_budget(model: budgets::Model) -> Result<Budget, StoreError> {
    to_document(model).map(Budget::from)
}

fn active_filter(query: &BudgetQuery) -> Condition {
    let mut cond = Condition::all().add(budgets::Column::IsActive.eq(true));
    if let Some(status) = query.status {
        cond = cond.add(budgets::Column::Status.eq(status.as_str()));
    }
    if let Some(ids) = &query.event_ids {
        cond = cond.add(budgets::Column::EventId.is_in(ids.iter().map(|id| id.into_inner())));
    }
    cond
}

#[async_trait]
impl BudgetStore for PgBudgetStore {
    async fn insert(&self, budget: &Budget) -> Result<(), StoreError> {
        let doc = budget.to_document();
        let model = to_active_model(&doc)?;
        match model.insert(&self.db).await {
            Ok(_) => Ok(()),
            Err(err) => match err.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(StoreError::DuplicateActive(doc.event_id))
                }
                _ => Err(backend(err)),
            },
        }
    }

    async fn find(&self, id: BudgetId) -> Result<Option<Budget>, StoreError> {
        budgets::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(to_budget)
            .transpose()
    }

    async fn find_active_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Budget>, StoreError> {
        budgets::Entity::find()
            .filter(budgets::Column::EventId.eq(event_id.into_inner()))
            .filter(budgets::Column::IsActive.eq(true))
            .one(&self.db)
            .await
            .map_err(backend)?
            .map(to_budget)
            .transpose()
    }

    async fn replace(&self, budget: &Budget) -> Result<Budget, StoreError> {
        let mut doc = budget.to_document();
        let expected = doc.version;
        doc.version = expected + 1;

        let mut model = to_active_model(&doc)?;
        model.id = NotSet;
        model.created_at = NotSet;

        let result = budgets::Entity::update_many()
            .set(model)
            .filter(budgets::Column::Id.eq(doc.id.into_inner()))
            .filter(budgets::Column::Version.eq(expected))
            .exec(&self.db)
            .await
            .map_err(backend)?;

        if result.rows_affected == 0 {
            let exists = budgets::Entity::find_by_id(doc.id.into_inner())
                .count(&self.db)
                .await
                .map_err(backend)?
                > 0;
            debug!(budget_id = %doc.id, expected, exists, "versioned write rejected");
            return Err(if exists {
                StoreError::VersionConflict {
                    budget_id: doc.id,
                    expected,
                }
            } else {
                StoreError::NotFound(doc.id)
            });
        }
        Ok(Budget::from(doc))
    }

    async fn list(
        &self,
        query: &BudgetQuery,
        page: PageRequest,
    ) -> Result<(Vec<Budget>, u64), StoreError> {
        if query.event_ids.as_ref().is_some_and(Vec::is_empty) {
            return Ok((Vec::new(), 0));
        }

        let select = budgets::Entity::find().filter(active_filter(query));
        let total = select.clone().count(&self.db).await.map_err(backend)?;
        let rows = select
            .order_by_desc(budgets::Column::CreatedAt)
            .order_by_desc(budgets::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(backend)?;

        let items = rows.into_iter().map(to_budget).collect::<Result<_, _>>()?;
        Ok((items, total))
    }

    async fn all_active(&self) -> Result<Vec<Budget>, StoreError> {
        budgets::Entity::find()
            .filter(budgets::Column::IsActive.eq(true))
            .all(&self.db)
            .await
            .map_err(backend)?
            .into_iter()
            .map(to_budget)
            .collect()
    }
}
