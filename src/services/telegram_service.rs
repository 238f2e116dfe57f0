use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use url::form_urlencoded;

use crate::error::{Error, Result};
use crate::services::notification_service::{DeliveryChannel, OutgoingMessage, Recipient};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct TelegramEnvelope {
    ok: bool,
    description: Option<String>,
    result: Option<JsonValue>,
}

#[derive(Clone)]
pub struct TelegramService {
    client: Client,
    bot_token: String,
    bot_username: String,
}

impl TelegramService {
    pub fn new(client: Client, bot_token: String, bot_username: String) -> Self {
        Self {
            client,
            bot_token,
            bot_username,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", TELEGRAM_API, self.bot_token, method)
    }

    /// `t.me` deep link that starts the bot with `payload`.
    pub fn deep_link(&self, payload: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("start", payload)
            .finish();
        format!("https://t.me/{}?{}", self.bot_username, query)
    }

    async fn call(&self, method: &str, body: &JsonValue) -> Result<JsonValue> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let envelope: TelegramEnvelope = response.json().await?;
        if !envelope.ok {
            return Err(Error::Internal(format!(
                "Telegram {} failed ({}): {}",
                method,
                status,
                envelope.description.unwrap_or_default()
            )));
        }
        Ok(envelope.result.unwrap_or(JsonValue::Null))
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        tracing::debug!(chat_id, "sending Telegram message");
        self.call(
            "sendMessage",
            &json!({
                "chat_id": chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }),
        )
        .await?;
        Ok(())
    }

    /// Points the bot webhook at `url` unless it already is.
    pub async fn ensure_webhook(&self, url: &str, secret: Option<&str>) -> Result<()> {
        let info = self.call("getWebhookInfo", &json!({})).await?;
        let current_url = info["url"].as_str().unwrap_or("");
        if current_url == url {
            tracing::info!(url, "Telegram webhook is already up to date");
            return Ok(());
        }

        tracing::info!(from = current_url, to = url, "updating Telegram webhook");
        let mut body = json!({ "url": url, "allowed_updates": ["message"] });
        if let Some(secret) = secret {
            body["secret_token"] = json!(secret);
        }
        self.call("setWebhook", &body).await?;
        tracing::info!("Telegram webhook registered successfully");
        Ok(())
    }
}

/// Public address Telegram posts updates to, rooted at the API's external origin.
pub fn webhook_url(api_public_url: &str) -> String {
    format!("{}/api/telegram/webhook", api_public_url.trim_end_matches('/'))
}

pub fn format_for_chat(message: &OutgoingMessage) -> String {
    let mut text = format!("{}\n\n{}", message.title, message.body);
    if let Some(url) = &message.action_url {
        text.push_str("\n\n");
        text.push_str(url);
    }
    text
}

#[async_trait]
impl DeliveryChannel for TelegramService {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutgoingMessage) -> anyhow::Result<()> {
        let chat_id = recipient
            .telegram_id
            .ok_or_else(|| anyhow::anyhow!("recipient has no linked Telegram account"))?;
        self.send_message(chat_id, &format_for_chat(message)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_text_includes_link_when_present() {
        let message = OutgoingMessage {
            title: "Task completed".into(),
            body: "\"Fix sink\" is complete.".into(),
            action_url: Some("https://trudify.com/en/tasks/1".into()),
            locale: Default::default(),
        };
        assert_eq!(
            format_for_chat(&message),
            "Task completed\n\n\"Fix sink\" is complete.\n\nhttps://trudify.com/en/tasks/1"
        );
    }

    #[test]
    fn deep_link_uses_bot_username() {
        let svc = TelegramService::new(Client::new(), "t".into(), "TrudifyBot".into());
        assert_eq!(svc.deep_link("abc"), "https://t.me/TrudifyBot?start=abc");
    }

    #[test]
    fn webhook_url_is_rooted_at_api_origin() {
        assert_eq!(
            webhook_url("https://api.trudify.com/"),
            "https://api.trudify.com/api/telegram/webhook"
        );
        assert_eq!(
            webhook_url("http://localhost:8000"),
            "http://localhost:8000/api/telegram/webhook"
        );
    }
}
