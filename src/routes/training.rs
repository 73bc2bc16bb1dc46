//! Training plan endpoints
//!
//! - `POST   /api/v1/training` - create a plan
//! - `GET    /api/v1/training` - list the caller's plans (cached)
//! - `GET    /api/v1/training/public` - paginated public plans
//! - `PATCH  /api/v1/training/:trainingId` - set visibility (admin only)
//! - `PUT    /api/v1/training/:trainingId` - append plan entries
//! - `DELETE /api/v1/training/:trainingId` - delete a plan

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
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
        training::{
            authorize, Action, NewTraining, PublicFlagUpdate, TrainingAppend, PUBLIC_FIELD,
        },
        ResourceKind, TrainingPlan, Visibility,
    },
    store::Filter,
    AppState,
};

/// Page size of the public listing when the client sends none
const PUBLIC_PAGE_SIZE: u64 = 10;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_training).get(list_training))
        .route("/public", get(list_public_training))
        .route(
            "/:training_id",
            patch(update_public_field)
                .put(append_training)
                .delete(delete_training),
        )
}

#[derive(Debug, Serialize)]
pub struct TrainingPayload {
    pub training: TrainingPlan,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedTraining {
    pub training_data: Vec<TrainingPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreshTraining {
    pub user_id: String,
    pub total_data: usize,
    pub training_data: Vec<TrainingPlan>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTrainingPage {
    pub total: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub training_data: Vec<TrainingPlan>,
}

fn not_found() -> AppError {
    AppError::NotFound("Training not found".to_string())
}

/// Admin status only matters for public plans; skip the lookup otherwise
async fn admin_for(state: &AppState, plan: &TrainingPlan, user_id: &str) -> AppResult<bool> {
    match plan.visibility() {
        Visibility::Public => state.identity.is_admin(user_id).await,
        Visibility::Private => Ok(false),
    }
}

/// Create a plan. Only admins may create public plans.
pub async fn create_training(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppJson(body): AppJson<NewTraining>,
) -> AppResult<Response> {
    let is_admin = body.wants_public() && state.identity.is_admin(&user.user_id).await?;
    let document = body.into_document(&user.user_id, is_admin)?;

    let training: TrainingPlan = state.gateway.create(&user.user_id, document).await?;
    info!(
        user_id = %user.user_id,
        training_id = %training.id,
        is_public = training.is_public,
        "Training plan created"
    );

    Ok(
        ApiResponse::ok("Training plan created successfully", TrainingPayload { training })
            .into_response(),
    )
}

/// List the caller's plans
pub async fn list_training(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Response> {
    match state
        .gateway
        .list::<TrainingPlan>(&user.user_id, &query)
        .await?
    {
        Listing::Cached(training_data) => Ok(ApiResponse::ok(
            "Training retrieved from cache successfully",
            CachedTraining { training_data },
        )
        .into_response()),
        Listing::Fresh(training_data) => Ok(ApiResponse::ok(
            "Training data retrieved successfully",
            FreshTraining {
                total_data: training_data.len(),
                user_id: user.user_id,
                training_data,
            },
        )
        .into_response()),
        Listing::Empty => Err(AppError::NoRecords(
            "No training found for this user".to_string(),
        )),
    }
}

/// Paginated listing of every public plan. Never cached.
pub async fn list_public_training(
    State(state): State<Arc<AppState>>,
    AppQuery(query): AppQuery<ListQuery>,
) -> AppResult<Response> {
    let window = query.page_window(ResourceKind::Training, PUBLIC_PAGE_SIZE);
    let filter = Filter::eq(PUBLIC_FIELD, true);

    let total = state.gateway.count(ResourceKind::Training, &filter).await?;
    let training_data = state
        .gateway
        .find_page::<TrainingPlan>(&filter, &window.options)
        .await?;

    Ok(ApiResponse::ok(
        "All public training data retrieved successfully",
        PublicTrainingPage {
            total,
            total_pages: window.total_pages(total),
            current_page: window.page,
            training_data,
        },
    )
    .into_response())
}

/// Set a plan's visibility. Admin only.
pub async fn update_public_field(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(training_id): AppPath<String>,
    AppJson(body): AppJson<PublicFlagUpdate>,
) -> AppResult<Response> {
    if !state.identity.is_admin(&user.user_id).await? {
        return Err(AppError::Forbidden(
            "Only admins can update public training data.".to_string(),
        ));
    }
    let update = body.into_update()?;

    let training: TrainingPlan = state
        .gateway
        .update(&user.user_id, &Filter::by_id(&training_id), update)
        .await?
        .ok_or_else(not_found)?;
    info!(
        training_id = %training.id,
        is_public = training.is_public,
        "Training visibility changed"
    );

    Ok(
        ApiResponse::ok("Training updated successfully", TrainingPayload { training })
            .into_response(),
    )
}

/// Append entries to an existing plan
pub async fn append_training(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(training_id): AppPath<String>,
    AppJson(body): AppJson<TrainingAppend>,
) -> AppResult<Response> {
    let existing = state
        .gateway
        .find::<TrainingPlan>(&training_id)
        .await?
        .ok_or_else(not_found)?;

    let is_admin = admin_for(&state, &existing, &user.user_id).await?;

    let training: TrainingPlan = state
        .gateway
        .modify(&user.user_id, &Filter::by_id(&training_id), |plan: TrainingPlan| {
            authorize(&plan, &user.user_id, is_admin, Action::Update)?;
            body.append_to(&plan)
        })
        .await?
        .ok_or_else(not_found)?;

    Ok(
        ApiResponse::ok("Training plan updated successfully", TrainingPayload { training })
            .into_response(),
    )
}

/// Delete a plan. Public plans need an admin, private plans their owner.
pub async fn delete_training(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
    AppPath(training_id): AppPath<String>,
) -> AppResult<Response> {
    let existing = state
        .gateway
        .find::<TrainingPlan>(&training_id)
        .await?
        .ok_or_else(not_found)?;

    let is_admin = admin_for(&state, &existing, &user.user_id).await?;
    authorize(&existing, &user.user_id, is_admin, Action::Delete)?;

    state
        .gateway
        .delete::<TrainingPlan>(&user.user_id, &Filter::by_id(&training_id))
        .await?
        .ok_or_else(not_found)?;

    Ok(ApiResponse::message("Training deleted successfully").into_response())
}
