use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::task_dto::{
        CanCreateTaskResponse, CreateTaskPayload, TaskListQuery, TaskListResponse,
        TaskReasonPayload, TaskResponse, UpdateTaskPayload,
    },
    error::Result,
    middleware::{auth::Claims, locale::RequestLocale},
    models::task::Task,
    AppState,
};

fn task_responses(tasks: Vec<Task>) -> Result<Vec<TaskResponse>> {
    tasks.into_iter().map(TaskResponse::new).collect()
}

/// Reason bodies are optional; an empty request body means no reason.
fn reason_of(payload: Option<Json<TaskReasonPayload>>) -> Result<Option<String>> {
    match payload {
        Some(Json(payload)) => {
            payload.validate()?;
            Ok(payload.reason)
        }
        None => Ok(None),
    }
}

#[utoipa::path(
    get,
    path = "/api/tasks",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("category" = Option<String>, Query, description = "Filter by category"),
        ("city" = Option<String>, Query, description = "Filter by city"),
        ("search" = Option<String>, Query, description = "Search in title and description")
    ),
    responses(
        (status = 200, description = "Open tasks", body = TaskListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse> {
    let list = state.task_service.list_open(query).await?;
    Ok(Json(TaskListResponse::try_from(list)?))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskPayload,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Too many completed tasks are waiting for a review")
    )
)]
#[axum::debug_handler]
pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RequestLocale(locale): RequestLocale,
    Json(payload): Json<CreateTaskPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let task = state
        .task_service
        .create(claims.user_id()?, payload, locale)
        .await?;
    Ok((StatusCode::CREATED, Json(TaskResponse::new(task)?)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/can-create",
    responses(
        (status = 200, description = "Review gate for the caller", body = CanCreateTaskResponse)
    )
)]
#[axum::debug_handler]
pub async fn can_create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let gate = state.review_service.gate(claims.user_id()?).await?;
    Ok(Json(gate))
}

#[axum::debug_handler]
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let tasks = state
        .task_service
        .list_for_customer(claims.user_id()?)
        .await?;
    Ok(Json(task_responses(tasks)?))
}

#[axum::debug_handler]
pub async fn assigned_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let tasks = state
        .task_service
        .list_for_professional(claims.user_id()?)
        .await?;
    Ok(Json(task_responses(tasks)?))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task with status permissions", body = TaskResponse),
        (status = 404, description = "Task not found")
    )
)]
#[axum::debug_handler]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let task = state.task_service.get(id).await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskPayload,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 403, description = "Not the task owner"),
        (status = 409, description = "Task can no longer be edited")
    )
)]
#[axum::debug_handler]
pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    RequestLocale(locale): RequestLocale,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let task = state
        .task_service
        .update(id, claims.user_id()?, payload, locale)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = TaskReasonPayload,
    responses(
        (status = 200, description = "Task cancelled", body = TaskResponse),
        (status = 409, description = "Task cannot be cancelled in its current status")
    )
)]
#[axum::debug_handler]
pub async fn cancel_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TaskReasonPayload>>,
) -> Result<impl IntoResponse> {
    let reason = reason_of(payload)?;
    let task = state
        .task_service
        .cancel(id, claims.user_id()?, reason)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[axum::debug_handler]
pub async fn reopen_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let task = state.task_service.reopen(id, claims.user_id()?).await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/mark-complete",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Completion requested from the other side", body = TaskResponse),
        (status = 409, description = "Task is not in progress")
    )
)]
#[axum::debug_handler]
pub async fn mark_complete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .mark_complete(id, claims.user_id()?)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[axum::debug_handler]
pub async fn confirm_completion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let task = state
        .task_service
        .confirm_completion(id, claims.user_id()?)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[axum::debug_handler]
pub async fn dispute_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TaskReasonPayload>>,
) -> Result<impl IntoResponse> {
    let reason = reason_of(payload)?;
    let task = state
        .task_service
        .dispute(id, claims.user_id()?, reason)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}

#[axum::debug_handler]
pub async fn remove_professional(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<TaskReasonPayload>>,
) -> Result<impl IntoResponse> {
    let reason = reason_of(payload)?;
    let task = state
        .task_service
        .remove_professional(id, claims.user_id()?, reason)
        .await?;
    Ok(Json(TaskResponse::new(task)?))
}
