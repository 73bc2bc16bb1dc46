//! Todo endpoints
//!
//! - `POST   /api/v1/todo` - create a todo
//! - `GET    /api/v1/todo` - list the caller's todos (cached)
//! - `PUT    /api/v1/todo/:todoId` - replace title and/or tasks
//! - `PATCH  /api/v1/todo/:todoId` - update one task
//! - `DELETE /api/v1/todo/:todoId` - delete a todo
//! - `DELETE /api/v1/todo/task/:taskId` - remove one task

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{delete, post, put},
    Router,
};
use serde::Serialize;

use super::{ApiResponse, AppJson, AppPath, AppQuery};
use crate::{
    cache::{ListQuery, Listing},
    error::{AppError, AppResult},
    middleware::auth::AuthenticatedUser,
    resources::{
        todo::{NewTodo, TaskUpdate, TodoUpdate},
        Todo,
    },
    store::{FindOptions, Filter, OWNER_FIELD},
    AppState,
};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_todo).get(list_todos))
        .route(
            "/:todo_id",
            put(update_todo).patch(update_task).delete(delete_todo),
        )
        .route("/task/:task_id", delete(delete_task))
}

#[derive(Debug, Serialize)]
pub struct TodoPayload {
    pub todo: Todo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTodos {
    pub todo_data: Vec<Todo>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshTodos {
    pub user_id: String,
    pub total_data: usize,
    pub todo_data: Vec<Todo>,
}

fn owned(todo_id: &str, user: &AuthenticatedUser) -> Filter {
    Filter::by_id(todo_id).and(OWNER_FIELD, user.user_id.as_str())
}

fn not_found() -> AppError {
    AppError::NotFound("Todo not found".to_string())
}

pub async fn create_todo(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppJson(body): AppJson<NewTodo>,
) -> AppResult<Response> {
    let document = body.into_document(&user.user_id)?;
    let todo: Todo = state.gateway.create(&user.user_id, document).await?;

    Ok(ApiResponse::ok("Todo created successfully", TodoPayload { todo }).into_response())
}

pub async fn list_todos(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Response> {
    match state.gateway.list::<Todo>(&user.user_id, &query).await? {
        Listing::Cached(todo_data) => Ok(ApiResponse::ok(
            "Todos retrieved from cache successfully",
            CachedTodos { todo_data },
        )
        .into_response()),
        Listing::Fresh(todo_data) => Ok(ApiResponse::ok(
            "Todos retrieved successfully",
            FreshTodos {
                total_data: todo_data.len(),
                user_id: user.user_id,
                todo_data,
            },
        )
        .into_response()),
        Listing::Empty => Err(AppError::NoRecords(
            "No todos found for this user".to_string(),
        )),
    }
}

pub async fn update_todo(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(todo_id): AppPath<String>,
    AppJson(body): AppJson<TodoUpdate>,
) -> AppResult<Response> {
    let update = body.into_update()?;

    let todo: Todo = state
        .gateway
        .update(&user.user_id, &owned(&todo_id, &user), update)
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::ok("Todo updated successfully", TodoPayload { todo }).into_response())
}

/// Update the text or completion of one task
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(todo_id): AppPath<String>,
    AppJson(body): AppJson<TaskUpdate>,
) -> AppResult<Response> {
    let todo: Todo = state
        .gateway
        .modify(&user.user_id, &owned(&todo_id, &user), |mut todo: Todo| {
            todo.apply_task_update(&body)
        })
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::ok("Task updated successfully", TodoPayload { todo }).into_response())
}

pub async fn delete_todo(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(todo_id): AppPath<String>,
) -> AppResult<Response> {
    state
        .gateway
        .delete::<Todo>(&user.user_id, &owned(&todo_id, &user))
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::message("Todo deleted successfully").into_response())
}

/// Remove a task from whichever of the caller's todos holds it
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(task_id): AppPath<String>,
) -> AppResult<Response> {
    let todos = state
        .gateway
        .find_page::<Todo>(
            &Filter::eq(OWNER_FIELD, user.user_id.as_str()),
            &FindOptions::default(),
        )
        .await?;

    let task_not_found = || AppError::NotFound("Task not found".to_string());
    let holder = todos
        .into_iter()
        .find(|todo| todo.has_task(&task_id))
        .ok_or_else(task_not_found)?;

    let todo: Todo = state
        .gateway
        .modify(&user.user_id, &owned(&holder.id, &user), |mut todo: Todo| {
            todo.remove_task(&task_id)?.ok_or_else(task_not_found)
        })
        .await?
        .ok_or_else(task_not_found)?;

    Ok(ApiResponse::ok("Task deleted successfully", TodoPayload { todo }).into_response())
}
