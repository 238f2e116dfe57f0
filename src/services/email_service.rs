use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::services::notification_service::{DeliveryChannel, OutgoingMessage, Recipient};
use crate::services::templates::{render_email_html, RenderedMessage};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

/// Transactional email through Resend. Without an API key every send is a no-op.
#[derive(Clone)]
pub struct EmailService {
    client: Client,
    api_key: Option<String>,
    from: String,
}

impl EmailService {
    pub fn new(client: Client, api_key: Option<String>, from: String) -> Self {
        Self {
            client,
            api_key,
            from,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let Some(api_key) = &self.api_key else {
            tracing::debug!(to, "email disabled, skipping send");
            return Ok(());
        };

        let payload = ResendPayload {
            from: &self.from,
            to: vec![to],
            subject,
            html,
        };
        let response = self
            .client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(to, "email sent");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Error::Internal(format!("Resend returned {}: {}", status, body)))
        }
    }
}

#[async_trait]
impl DeliveryChannel for EmailService {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn deliver(&self, recipient: &Recipient, message: &OutgoingMessage) -> anyhow::Result<()> {
        let to = recipient
            .email
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("recipient has no email address"))?;
        let rendered = RenderedMessage {
            title: message.title.clone(),
            body: message.body.clone(),
        };
        let html = render_email_html(message.locale, &rendered, message.action_url.as_deref())?;
        self.send(to, &message.title, &html).await?;
        Ok(())
    }
}
