use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{CreateApplicationPayload, RejectApplicationPayload},
    error::Result,
    middleware::auth::Claims,
    models::application::{Application, ApplicationWithProfessional},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/applications",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Application),
        (status = 403, description = "Applying to your own task"),
        (status = 409, description = "Task is not open or already applied")
    )
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .apply(task_id, claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/applications",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Applications with applicant profiles", body = Vec<ApplicationWithProfessional>),
        (status = 403, description = "Not the task owner")
    )
)]
#[axum::debug_handler]
pub async fn list_for_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(task_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_task(task_id, claims.user_id()?)
        .await?;
    Ok(Json(applications))
}

#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_professional(claims.user_id()?)
        .await?;
    Ok(Json(applications))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/accept",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application accepted, task in progress", body = Application),
        (status = 409, description = "Task or application no longer accepts this")
    )
)]
#[axum::debug_handler]
pub async fn accept(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .accept(id, claims.user_id()?)
        .await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn reject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectApplicationPayload>>,
) -> Result<impl IntoResponse> {
    let reason = match payload {
        Some(Json(payload)) => {
            payload.validate()?;
            payload.reason
        }
        None => None,
    };
    let application = state
        .application_service
        .reject(id, claims.user_id()?, reason)
        .await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .withdraw(id, claims.user_id()?)
        .await?;
    Ok(Json(application))
}
