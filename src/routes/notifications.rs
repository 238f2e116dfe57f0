use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    dto::notification_dto::{
        DismissAllResponse, NotificationListQuery, NotificationListResponse, UnreadCountResponse,
    },
    error::Result,
    middleware::auth::Claims,
    models::notification::Notification,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("state" = Option<String>, Query, description = "sent or dismissed"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = NotificationListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse> {
    let (items, total, page, per_page) = state
        .notification_service
        .list(claims.user_id()?, query)
        .await?;
    Ok(Json(NotificationListResponse {
        items,
        total,
        page,
        per_page,
    }))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Number of undismissed notifications", body = UnreadCountResponse)
    )
)]
#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let count = state
        .notification_service
        .unread_count(claims.user_id()?)
        .await?;
    Ok(Json(UnreadCountResponse { count }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/dismiss",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification dismissed", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
#[axum::debug_handler]
pub async fn dismiss(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .dismiss(id, claims.user_id()?)
        .await?;
    Ok(Json(notification))
}

#[axum::debug_handler]
pub async fn undismiss(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .undismiss(id, claims.user_id()?)
        .await?;
    Ok(Json(notification))
}

#[axum::debug_handler]
pub async fn dismiss_all(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let dismissed = state
        .notification_service
        .dismiss_all(claims.user_id()?)
        .await?;
    Ok(Json(DismissAllResponse { dismissed }))
}
