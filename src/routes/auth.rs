use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    config::get_config,
    dto::auth_dto::{AuthResponse, LoginPayload, SignupPayload, TelegramLoginPayload},
    error::{Error, Result},
    middleware::locale::RequestLocale,
    models::user::User,
    utils::{telegram_auth::verify_login_widget, token::issue_jwt},
    AppState,
};

fn auth_response(user: User) -> Result<AuthResponse> {
    let config = get_config();
    let token = issue_jwt(
        user.id,
        &user.role_hint,
        &config.jwt_secret,
        config.jwt_ttl_hours,
    )
    .map_err(|e| Error::Internal(format!("failed to issue token: {}", e)))?;
    Ok(AuthResponse { token, user })
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupPayload,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Json(mut payload): Json<SignupPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    payload.preferred_language.get_or_insert(locale);
    let user = state.user_service.signup(payload).await?;
    Ok((StatusCode::CREATED, Json(auth_response(user)?)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .user_service
        .authenticate(&payload.email, &payload.password)
        .await?;
    Ok(Json(auth_response(user)?))
}

#[utoipa::path(
    post,
    path = "/api/auth/telegram",
    request_body = TelegramLoginPayload,
    responses(
        (status = 200, description = "Signed in with Telegram", body = AuthResponse),
        (status = 401, description = "Signature invalid or expired")
    )
)]
#[axum::debug_handler]
pub async fn telegram_login(
    State(state): State<AppState>,
    RequestLocale(locale): RequestLocale,
    Json(payload): Json<TelegramLoginPayload>,
) -> Result<impl IntoResponse> {
    let config = get_config();
    let now = chrono::Utc::now().timestamp();
    if !verify_login_widget(&payload, &config.telegram_bot_token, now) {
        tracing::warn!(telegram_id = payload.id, "rejected Telegram login payload");
        return Err(Error::Unauthorized("Invalid Telegram login".into()));
    }
    let user = state
        .user_service
        .upsert_telegram_user(&payload, locale)
        .await?;
    Ok(Json(auth_response(user)?))
}
