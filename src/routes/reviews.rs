use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use validator::Validate;

use crate::{
    dto::review_dto::CreateReviewPayload, error::Result, middleware::auth::Claims,
    models::review::Review, models::task::PendingReviewTask, AppState,
};

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewPayload,
    responses(
        (status = 201, description = "Review submitted", body = Review),
        (status = 409, description = "Task not completed or already reviewed")
    )
)]
#[axum::debug_handler]
pub async fn create_review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateReviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let review = state
        .review_service
        .create(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/reviews/pending",
    responses(
        (status = 200, description = "Completed tasks awaiting the caller's review", body = Vec<PendingReviewTask>)
    )
)]
#[axum::debug_handler]
pub async fn pending_reviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let pending = state
        .review_service
        .pending_for_customer(claims.user_id()?)
        .await?;
    Ok(Json(pending))
}
