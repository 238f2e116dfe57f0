use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::locale::Locale;
use crate::dto::notification_dto::NotificationListQuery;
use crate::error::{Error, Result};
use crate::models::notification::Notification;
use crate::models::task::Task;
use crate::models::user::{NotificationChannel, User};
use crate::services::templates::{render, NotificationKind};

/// Contact details of the user a notification is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub telegram_id: Option<i64>,
    pub locale: Locale,
    pub channel: NotificationChannel,
}

impl From<&User> for Recipient {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            telegram_id: user.telegram_id,
            locale: user.locale(),
            channel: NotificationChannel::parse(&user.notification_channel),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub title: String,
    pub body: String,
    pub action_url: Option<String>,
    pub locale: Locale,
}

/// An out-of-app delivery channel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn deliver(&self, recipient: &Recipient, message: &OutgoingMessage) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Telegram,
    Email,
}

/// Channels a message goes to, given the recipient's preference and contacts.
/// A Telegram preference without a linked account falls back to email.
pub fn select_channels(recipient: &Recipient) -> Vec<ChannelKind> {
    let has_telegram = recipient.telegram_id.is_some();
    let has_email = recipient.email.is_some();

    let mut channels = Vec::new();
    match recipient.channel {
        NotificationChannel::None => {}
        NotificationChannel::Email => {
            if has_email {
                channels.push(ChannelKind::Email);
            }
        }
        NotificationChannel::Telegram => {
            if has_telegram {
                channels.push(ChannelKind::Telegram);
            } else if has_email {
                channels.push(ChannelKind::Email);
            }
        }
        NotificationChannel::Both => {
            if has_telegram {
                channels.push(ChannelKind::Telegram);
            }
            if has_email {
                channels.push(ChannelKind::Email);
            }
        }
    }
    channels
}

/// Fans a message out to the selected channels. Failures are logged, never returned.
#[derive(Clone)]
pub struct Dispatcher {
    telegram: Arc<dyn DeliveryChannel>,
    email: Arc<dyn DeliveryChannel>,
}

impl Dispatcher {
    pub fn new(telegram: Arc<dyn DeliveryChannel>, email: Arc<dyn DeliveryChannel>) -> Self {
        Self { telegram, email }
    }

    /// Returns how many channels accepted the message.
    pub async fn deliver(&self, recipient: &Recipient, message: &OutgoingMessage) -> usize {
        let mut delivered = 0;
        for kind in select_channels(recipient) {
            let channel = match kind {
                ChannelKind::Telegram => &self.telegram,
                ChannelKind::Email => &self.email,
            };
            match channel.deliver(recipient, message).await {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    user_id = %recipient.user_id,
                    channel = channel.name(),
                    error = %err,
                    "notification delivery failed"
                ),
            }
        }
        delivered
    }
}

/// A notification about a task, addressed to one user.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
    pub task_id: Uuid,
    pub task_title: String,
    pub task_title_bg: Option<String>,
    pub actor_id: Option<Uuid>,
    pub extra: Map<String, JsonValue>,
}

impl NotificationEvent {
    pub fn for_task(task: &Task, recipient_id: Uuid, kind: NotificationKind) -> Self {
        Self {
            recipient_id,
            kind,
            task_id: task.id,
            task_title: task.title.clone(),
            task_title_bg: task.title_bg.clone(),
            actor_id: None,
            extra: Map::new(),
        }
    }

    pub fn by(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    fn title_for(&self, locale: Locale) -> &str {
        match (locale, &self.task_title_bg) {
            (Locale::Bg, Some(title_bg)) => title_bg,
            _ => &self.task_title,
        }
    }
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    dispatcher: Dispatcher,
    webapp_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, dispatcher: Dispatcher, webapp_url: String) -> Self {
        Self {
            pool,
            dispatcher,
            webapp_url: webapp_url.trim_end_matches('/').to_string(),
        }
    }

    /// Records and delivers `event` in the background.
    pub fn notify(&self, event: NotificationEvent) {
        let service = self.clone();
        tokio::spawn(async move {
            let kind = event.kind.as_str();
            let recipient_id = event.recipient_id;
            if let Err(err) = service.record_and_deliver(event).await {
                tracing::warn!(%recipient_id, kind, error = ?err, "failed to send notification");
            }
        });
    }

    /// Stores the in-app notification and hands it to the out-of-app channels.
    /// Returns `None` when the recipient no longer exists.
    pub async fn record_and_deliver(&self, event: NotificationEvent) -> Result<Option<Notification>> {
        let Some(user) = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(event.recipient_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let actor_name = match event.actor_id {
            Some(actor_id) => {
                sqlx::query_scalar::<_, String>("SELECT full_name FROM users WHERE id = $1")
                    .bind(actor_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        let recipient = Recipient::from(&user);
        let mut context = event.extra.clone();
        context.insert("task_title".into(), json!(event.title_for(recipient.locale)));
        if let Some(name) = actor_name {
            context.insert("actor_name".into(), json!(name));
        }
        let context = JsonValue::Object(context);
        let rendered = render(recipient.locale, event.kind, &context);
        let action_url = format!(
            "{}/{}/tasks/{}",
            self.webapp_url, recipient.locale, event.task_id
        );

        let mut metadata = event.extra.clone();
        metadata.insert("task_id".into(), json!(event.task_id));
        if let Some(actor_id) = event.actor_id {
            metadata.insert("actor_id".into(), json!(actor_id));
        }

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, metadata, action_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(event.kind.as_str())
        .bind(&rendered.title)
        .bind(&rendered.body)
        .bind(JsonValue::Object(metadata))
        .bind(&action_url)
        .fetch_one(&self.pool)
        .await?;

        let message = OutgoingMessage {
            title: rendered.title,
            body: rendered.body,
            action_url: Some(action_url),
            locale: recipient.locale,
        };
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            dispatcher.deliver(&recipient, &message).await;
        });

        Ok(Some(notification))
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        query: NotificationListQuery,
    ) -> Result<(Vec<Notification>, i64, i64, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        if let Some(state) = query.state.as_deref() {
            if state != "sent" && state != "dismissed" {
                return Err(Error::BadRequest(format!("Unknown notification state '{}'", state)));
            }
        }

        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND ($2::text IS NULL OR state = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&query.state)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND ($2::text IS NULL OR state = $2)",
        )
        .bind(user_id)
        .bind(&query.state)
        .fetch_one(&self.pool)
        .await?;

        Ok((items, total, page, per_page))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND state = 'sent'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn dismiss(&self, id: Uuid, user_id: Uuid) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET state = 'dismissed', dismissed_at = COALESCE(dismissed_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Notification not found".into()))?;
        Ok(notification)
    }

    pub async fn undismiss(&self, id: Uuid, user_id: Uuid) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET state = 'sent', dismissed_at = NULL
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Notification not found".into()))?;
        Ok(notification)
    }

    pub async fn dismiss_all(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET state = 'dismissed', dismissed_at = NOW()
            WHERE user_id = $1 AND state = 'sent'
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipient(channel: NotificationChannel, telegram: bool, email: bool) -> Recipient {
        Recipient {
            user_id: Uuid::new_v4(),
            email: email.then(|| "user@example.com".to_string()),
            telegram_id: telegram.then_some(777),
            locale: Locale::En,
            channel,
        }
    }

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            title: "t".into(),
            body: "b".into(),
            action_url: None,
            locale: Locale::En,
        }
    }

    #[test]
    fn channel_selection() {
        use ChannelKind::*;
        use NotificationChannel as Pref;

        assert_eq!(select_channels(&recipient(Pref::Email, true, true)), vec![Email]);
        assert_eq!(select_channels(&recipient(Pref::Telegram, true, true)), vec![Telegram]);
        assert_eq!(select_channels(&recipient(Pref::Telegram, false, true)), vec![Email]);
        assert_eq!(select_channels(&recipient(Pref::Both, true, true)), vec![Telegram, Email]);
        assert_eq!(select_channels(&recipient(Pref::Both, true, false)), vec![Telegram]);
        assert!(select_channels(&recipient(Pref::None, true, true)).is_empty());
        assert!(select_channels(&recipient(Pref::Email, true, false)).is_empty());
    }

    #[tokio::test]
    async fn failed_channel_does_not_stop_the_other() {
        let mut telegram = MockDeliveryChannel::new();
        telegram.expect_name().return_const("telegram");
        telegram
            .expect_deliver()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("bot blocked by user")));

        let mut email = MockDeliveryChannel::new();
        email.expect_name().return_const("email");
        email.expect_deliver().times(1).returning(|_, _| Ok(()));

        let dispatcher = Dispatcher::new(Arc::new(telegram), Arc::new(email));
        let delivered = dispatcher
            .deliver(&recipient(NotificationChannel::Both, true, true), &message())
            .await;
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn none_preference_sends_nothing() {
        let mut telegram = MockDeliveryChannel::new();
        telegram.expect_deliver().never();
        let mut email = MockDeliveryChannel::new();
        email.expect_deliver().never();

        let dispatcher = Dispatcher::new(Arc::new(telegram), Arc::new(email));
        let delivered = dispatcher
            .deliver(&recipient(NotificationChannel::None, true, true), &message())
            .await;
        assert_eq!(delivered, 0);
    }

    #[test]
    fn bulgarian_recipients_get_translated_title() {
        let event = NotificationEvent {
            recipient_id: Uuid::new_v4(),
            kind: NotificationKind::TaskCompleted,
            task_id: Uuid::new_v4(),
            task_title: "Paint the fence".into(),
            task_title_bg: Some("Боядисване на ограда".into()),
            actor_id: None,
            extra: Map::new(),
        };
        assert_eq!(event.title_for(Locale::Bg), "Боядисване на ограда");
        assert_eq!(event.title_for(Locale::Ru), "Paint the fence");
    }
}
