//! User display names.

use std::collections::HashMap;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use eventledger_core::store::{ActorDirectory, StoreError};
use eventledger_shared::types::UserId;

use super::backend;
use crate::entities::users;

/// Users stored in the `users` table.
#[derive(Debug, Clone)]
pub struct PgActorDirectory {
    db: DatabaseConnection,
}

impl PgActorDirectory {
    /// Creates a new actor directory.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActorDirectory for PgActorDirectory {
    async fn display_names(&self, ids: &[UserId]) -> Result<HashMap<UserId, String>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = users::Entity::find()
            .filter(users::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .all(&self.db)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|u| (UserId::from_uuid(u.id), u.display_name))
            .collect())
    }
}
