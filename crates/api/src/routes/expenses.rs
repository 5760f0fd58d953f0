//! Expense routes nested under a budget.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{patch, post, put},
};
use serde::Deserialize;

use eventledger_core::budget::{ExpenseForm, ExpensePatchForm, StatusForm};
use eventledger_shared::types::{BudgetId, ExpenseId};

use super::budgets::BudgetResponse;
use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{ValidJson, ValidPath};
use crate::middleware::AuthUser;

/// Creates the expense routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets/{budget_id}/expenses", post(add_expense))
        .route(
            "/budgets/{budget_id}/expenses/{expense_id}",
            patch(update_expense).delete(delete_expense),
        )
        .route(
            "/budgets/{budget_id}/expenses/{expense_id}/status",
            put(set_status),
        )
}

/// Path of a single expense.
#[derive(Debug, Deserialize)]
pub struct ExpensePath {
    /// Owning budget.
    pub budget_id: BudgetId,
    /// Expense within it.
    pub expense_id: ExpenseId,
}

async fn add_expense(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(budget_id): ValidPath<BudgetId>,
    ValidJson(form): ValidJson<ExpenseForm>,
) -> Result<(StatusCode, Json<BudgetResponse>), ApiError> {
    let (budget, _) = state
        .ledger
        .workflow
        .add_expense(budget_id, form, &actor)
        .await?;
    Ok((StatusCode::CREATED, Json(budget.into())))
}

async fn update_expense(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(path): ValidPath<ExpensePath>,
    ValidJson(form): ValidJson<ExpensePatchForm>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state
        .ledger
        .workflow
        .update_expense(path.budget_id, path.expense_id, form, &actor)
        .await?;
    Ok(Json(budget.into()))
}

async fn set_status(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(path): ValidPath<ExpensePath>,
    ValidJson(form): ValidJson<StatusForm>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state
        .ledger
        .workflow
        .set_status(path.budget_id, path.expense_id, form, &actor)
        .await?;
    Ok(Json(budget.into()))
}

async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(path): ValidPath<ExpensePath>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state
        .ledger
        .workflow
        .delete_expense(path.budget_id, path.expense_id, &actor)
        .await?;
    Ok(Json(budget.into()))
}
