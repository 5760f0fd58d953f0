//! Budget routes.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use eventledger_core::analytics::BudgetAnalytics;
use eventledger_core::budget::{Budget, BudgetDocument, BudgetForm, BudgetListForm, BudgetPatchForm};
use eventledger_core::services::ReconcileReport;
use eventledger_shared::types::{BudgetId, PageResponse};

use crate::AppState;
use crate::error::ApiError;
use crate::extractors::{ValidJson, ValidPath, ValidQuery};
use crate::middleware::AuthUser;

/// Creates the budget routes (requires auth middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budgets", post(create_budget).get(list_budgets))
        .route("/budgets/analytics", get(get_analytics))
        .route("/budgets/reconcile", post(reconcile_links))
        .route(
            "/budgets/{budget_id}",
            get(get_budget).patch(update_budget).delete(delete_budget),
        )
        .route("/budgets/{budget_id}/export", get(export_budget))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A budget as returned by the API.
#[derive(Debug, Serialize)]
pub struct BudgetResponse {
    /// Stored fields, expenses included.
    #[serde(flatten)]
    pub budget: BudgetDocument,
    /// `total_amount - spent_amount`; negative when overspent.
    pub remaining_amount: Decimal,
}

impl From<Budget> for BudgetResponse {
    fn from(budget: Budget) -> Self {
        Self {
            remaining_amount: budget.remaining_amount(),
            budget: budget.to_document(),
        }
    }
}

/// Query for the export endpoint.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// `json`, `csv`, `pdf` or `xlsx`; defaults to `json`.
    #[serde(default)]
    pub format: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_budget(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidJson(form): ValidJson<BudgetForm>,
) -> Result<(StatusCode, Json<BudgetResponse>), ApiError> {
    let budget = state.ledger.repository.create(form, &actor).await?;
    Ok((StatusCode::CREATED, Json(budget.into())))
}

async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidQuery(form): ValidQuery<BudgetListForm>,
) -> Result<Json<PageResponse<BudgetResponse>>, ApiError> {
    let page = state.ledger.repository.list(form, &actor).await?;
    Ok(Json(page.map(BudgetResponse::from)))
}

async fn get_budget(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(budget_id): ValidPath<BudgetId>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state.ledger.repository.get(budget_id, &actor).await?;
    Ok(Json(budget.into()))
}

async fn update_budget(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(budget_id): ValidPath<BudgetId>,
    ValidJson(form): ValidJson<BudgetPatchForm>,
) -> Result<Json<BudgetResponse>, ApiError> {
    let budget = state
        .ledger
        .repository
        .update_fields(budget_id, form, &actor)
        .await?;
    Ok(Json(budget.into()))
}

async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(budget_id): ValidPath<BudgetId>,
) -> Result<StatusCode, ApiError> {
    state.ledger.repository.soft_delete(budget_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_analytics(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<BudgetAnalytics>, ApiError> {
    Ok(Json(state.ledger.analytics.summarize(&actor).await?))
}

async fn reconcile_links(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<ReconcileReport>, ApiError> {
    Ok(Json(
        state.ledger.repository.reconcile_event_links(&actor).await?,
    ))
}

async fn export_budget(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    ValidPath(budget_id): ValidPath<BudgetId>,
    ValidQuery(query): ValidQuery<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = query.format.as_deref().unwrap_or("json");
    let doc = state.ledger.exports.export(budget_id, format, &actor).await?;

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", doc.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(doc.content_type)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        doc.body,
    )
        .into_response())
}
