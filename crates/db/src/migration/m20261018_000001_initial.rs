//! Initial schema: users, events and budgets.
//!
//! The partial unique index on `budgets(event_id) WHERE is_active` is what
//! makes "one active budget per event" hold across processes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS budgets CASCADE;
             DROP TABLE IF EXISTS events CASCADE;
             DROP TABLE IF EXISTS users CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    display_name VARCHAR(255) NOT NULL,
    email VARCHAR(255),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE events (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title VARCHAR(255) NOT NULL,
    event_type VARCHAR(64),
    budget_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE budgets (
    id UUID PRIMARY KEY,
    event_id UUID NOT NULL REFERENCES events(id) ON DELETE RESTRICT,
    total_amount NUMERIC(19, 4) NOT NULL,
    spent_amount NUMERIC(19, 4) NOT NULL DEFAULT 0,
    status VARCHAR(16) NOT NULL DEFAULT 'active',
    expenses JSONB NOT NULL DEFAULT '[]'::jsonb,
    notes TEXT,
    created_by UUID NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    version BIGINT NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_budgets_total_non_negative CHECK (total_amount >= 0),
    CONSTRAINT chk_budgets_status CHECK (status IN ('active', 'closed', 'cancelled')),
    CONSTRAINT chk_budgets_expenses_array CHECK (jsonb_typeof(expenses) = 'array')
);

-- At most one active budget per event
CREATE UNIQUE INDEX uq_budgets_active_event ON budgets(event_id) WHERE is_active;

-- Listing order
CREATE INDEX idx_budgets_active_created ON budgets(created_at DESC, id DESC) WHERE is_active;

-- Title search and link repair
CREATE INDEX idx_events_title_lower ON events(lower(title));
CREATE INDEX idx_events_budget ON events(budget_id) WHERE budget_id IS NOT NULL;
";
