//! Expense endpoints
//!
//! - `POST   /api/v1/expense` - create one expense or a batch
//! - `GET    /api/v1/expense` - list the caller's expenses (cached)
//! - `PUT    /api/v1/expense/:expenseId` - update an expense
//! - `DELETE /api/v1/expense/:expenseId` - delete an expense

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{post, put},
    Router,
};
use serde::Serialize;
use tracing::info;

use super::{ApiResponse, AppJson, AppPath, AppQuery};
use crate::{
    cache::{ListQuery, Listing},
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    resources::{
        expense::{CreateExpenses, ExpenseUpdate},
        Expense, ExpenseSummary,
    },
    store::{Filter, OWNER_FIELD},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_expense).get(list_expenses))
        .route("/:expense_id", put(update_expense).delete(delete_expense))
}

#[derive(Debug, Serialize)]
pub struct ExpensePayload {
    pub expense: Expense,
}

#[derive(Debug, Serialize)]
pub struct ExpensesPayload {
    pub expenses: Vec<Expense>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedExpenses {
    pub expense_data: Vec<ExpenseSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshExpenses {
    pub user_id: String,
    pub total_expense: usize,
    pub expense_data: Vec<ExpenseSummary>,
}

fn owned(expense_id: &str, user: &AuthenticatedUser) -> Filter {
    Filter::by_id(expense_id).and(OWNER_FIELD, user.user_id.as_str())
}

/// Create one expense, or a batch when the body is an array
pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppJson(body): AppJson<CreateExpenses>,
) -> AppResult<Response> {
    let batch = body.is_batch();
    let documents = body.into_documents(&user.user_id)?;

    if batch {
        let expenses: Vec<Expense> = state
            .gateway
            .create_many(&user.user_id, documents)
            .await?;
        info!(user_id = %user.user_id, count = expenses.len(), "Expenses created");
        return Ok(
            ApiResponse::ok("Expenses created successfully", ExpensesPayload { expenses })
                .into_response(),
        );
    }

    let document = documents
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("An expense is required".to_string()))?;
    let expense: Expense = state.gateway.create(&user.user_id, document).await?;

    Ok(ApiResponse::ok("Expense created successfully", ExpensePayload { expense }).into_response())
}

/// List the caller's expenses
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Response> {
    match state.gateway.list::<Expense>(&user.user_id, &query).await? {
        Listing::Cached(expense_data) => Ok(ApiResponse::ok(
            "Expenses retrieved from cache successfully",
            CachedExpenses { expense_data },
        )
        .into_response()),
        Listing::Fresh(expense_data) => Ok(ApiResponse::ok(
            "Expenses retrieved successfully",
            FreshExpenses {
                total_expense: expense_data.len(),
                user_id: user.user_id,
                expense_data,
            },
        )
        .into_response()),
        Listing::Empty => Err(AppError::NoRecords(
            "No expenses found for this user".to_string(),
        )),
    }
}

/// Update one of the caller's expenses
pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(expense_id): AppPath<String>,
    AppJson(body): AppJson<ExpenseUpdate>,
) -> AppResult<Response> {
    let update = body.into_update()?;

    let expense: Expense = state
        .gateway
        .update(&user.user_id, &owned(&expense_id, &user), update)
        .await?
        .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

    Ok(ApiResponse::ok("Expense updated successfully", ExpensePayload { expense }).into_response())
}

/// Delete one of the caller's expenses
pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(expense_id): AppPath<String>,
) -> AppResult<Response> {
    state
        .gateway
        .delete::<Expense>(&user.user_id, &owned(&expense_id, &user))
        .await?
        .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

    Ok(ApiResponse::message("Expense deleted successfully").into_response())
}
