use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    dto::profile_dto::PublicProfileResponse,
    error::Result,
    models::{review::PublishedReview, user::PublicUser},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ReviewListQuery {
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Public profile", body = PublicProfileResponse),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_active(id).await?;
    Ok(Json(PublicProfileResponse {
        user: PublicUser::from(user),
    }))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/reviews",
    params(
        ("id" = Uuid, Path, description = "User ID"),
        ("limit" = Option<i64>, Query, description = "Number of reviews to return")
    ),
    responses(
        (status = 200, description = "Published reviews about the user", body = Vec<PublishedReview>)
    )
)]
#[axum::debug_handler]
pub async fn list_user_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReviewListQuery>,
) -> Result<impl IntoResponse> {
    let reviews = state
        .review_service
        .list_published_for_user(id, query.limit.unwrap_or(20))
        .await?;
    Ok(Json(reviews))
}
