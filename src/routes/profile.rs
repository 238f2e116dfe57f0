use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::{
    dto::profile_dto::{DeletionPreflightResponse, UpdateProfilePayload},
    error::Result,
    middleware::auth::Claims,
    models::user::User,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "Own profile", body = User),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_active(claims.user_id()?).await?;
    Ok(Json(user))
}

#[utoipa::path(
    patch,
    path = "/api/profile",
    request_body = UpdateProfilePayload,
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .update_profile(claims.user_id()?, payload)
        .await?;
    Ok(Json(user))
}

#[utoipa::path(
    get,
    path = "/api/profile/deletion-preflight",
    responses(
        (status = 200, description = "What prevents account deletion", body = DeletionPreflightResponse)
    )
)]
#[axum::debug_handler]
pub async fn deletion_preflight(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let preflight = state
        .user_service
        .deletion_preflight(claims.user_id()?)
        .await?;
    Ok(Json(preflight))
}

#[utoipa::path(
    delete,
    path = "/api/profile",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 409, description = "Account has active tasks or applications")
    )
)]
#[axum::debug_handler]
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    state.user_service.soft_delete(claims.user_id()?).await?;
    Ok(StatusCode::NO_CONTENT)
}
