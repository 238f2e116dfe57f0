use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::{
    config::get_config,
    domain::locale::Locale,
    error::{Error, Result},
    middleware::auth::Claims,
    services::{
        templates::{bot_text, BotText},
        user_service::LINK_TOKEN_TTL_MINUTES,
    },
    AppState,
};

pub const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub username: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct LinkTokenResponse {
    pub token: String,
    pub deep_link: String,
    pub expires_in_seconds: i64,
}

/// Without a configured secret every update is accepted.
pub fn secret_matches(expected: Option<&str>, provided: Option<&str>) -> bool {
    match (expected, provided) {
        (None, _) => true,
        (Some(expected), Some(provided)) => {
            bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
        }
        (Some(_), None) => false,
    }
}

/// Token passed through a `t.me/<bot>?start=<token>` deep link.
pub fn start_payload(text: &str) -> Option<&str> {
    let rest = text.trim().strip_prefix("/start")?;
    let payload = rest.trim();
    (!payload.is_empty() && !payload.contains(char::is_whitespace)).then_some(payload)
}

#[axum::debug_handler]
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<TelegramUpdate>,
) -> Result<impl IntoResponse> {
    let config = get_config();
    let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(config.telegram_webhook_secret.as_deref(), provided) {
        tracing::warn!(update_id = update.update_id, "Telegram webhook secret mismatch");
        return Err(Error::Unauthorized("invalid webhook secret".into()));
    }

    let Some(message) = update.message else {
        return Ok(Json(json!({ "ok": true })));
    };
    let (Some(from), Some(text)) = (message.from, message.text) else {
        return Ok(Json(json!({ "ok": true })));
    };
    tracing::debug!(
        update_id = update.update_id,
        message_id = message.message_id,
        telegram_id = from.id,
        "Telegram update received"
    );

    let sender_locale = from
        .language_code
        .as_deref()
        .and_then(Locale::from_tag)
        .unwrap_or_default();

    let reply = match start_payload(&text) {
        Some(token) => {
            match state
                .user_service
                .consume_link_token(token, from.id, from.username.as_deref())
                .await?
            {
                Some(user) => bot_text(user.locale(), BotText::Linked),
                None => bot_text(sender_locale, BotText::LinkInvalid),
            }
        }
        None => {
            let locale = match state.user_service.find_by_telegram_id(from.id).await? {
                Some(user) => user.locale(),
                None => sender_locale,
            };
            bot_text(locale, BotText::Help)
        }
    };

    let telegram = state.telegram_service.clone();
    let chat_id = message.chat.id;
    tokio::spawn(async move {
        if let Err(err) = telegram.send_message(chat_id, reply).await {
            tracing::warn!(chat_id, error = ?err, "failed to reply to Telegram user");
        }
    });

    Ok(Json(json!({ "ok": true })))
}

#[utoipa::path(
    post,
    path = "/api/telegram/link-token",
    responses(
        (status = 201, description = "One-time token and bot deep link", body = LinkTokenResponse)
    )
)]
#[axum::debug_handler]
pub async fn create_link_token(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.get_active(claims.user_id()?).await?;
    let token = state.user_service.create_link_token(user.id).await?;
    let deep_link = state.telegram_service.deep_link(&token);
    Ok((
        StatusCode::CREATED,
        Json(LinkTokenResponse {
            token,
            deep_link,
            expires_in_seconds: LINK_TOKEN_TTL_MINUTES * 60,
        }),
    ))
}

#[axum::debug_handler]
pub async fn unlink(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.user_service.unlink_telegram(claims.user_id()?).await?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_payload_extraction() {
        assert_eq!(start_payload("/start abc123"), Some("abc123"));
        assert_eq!(start_payload("  /start   abc123 "), Some("abc123"));
        assert_eq!(start_payload("/start"), None);
        assert_eq!(start_payload("/start a b"), None);
        assert_eq!(start_payload("hello"), None);
    }

    #[test]
    fn secret_comparison() {
        assert!(secret_matches(None, None));
        assert!(secret_matches(Some("s3cret"), Some("s3cret")));
        assert!(!secret_matches(Some("s3cret"), Some("s3cre")));
        assert!(!secret_matches(Some("s3cret"), None));
    }
}
