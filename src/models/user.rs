use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::locale::Locale;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub full_name: String,
    pub role_hint: String,
    pub telegram_id: Option<i64>,
    pub telegram_username: Option<String>,
    pub preferred_language: String,
    pub notification_channel: String,
    pub average_rating: Option<f64>,
    pub total_reviews: i32,
    pub tasks_completed: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn locale(&self) -> Locale {
        Locale::from_tag(&self.preferred_language).unwrap_or_default()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields of a user visible to anyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub full_name: String,
    pub role_hint: String,
    pub average_rating: Option<f64>,
    pub total_reviews: i32,
    pub tasks_completed: i32,
    pub created_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            full_name: value.full_name,
            role_hint: value.role_hint,
            average_rating: value.average_rating,
            total_reviews: value.total_reviews,
            tasks_completed: value.tasks_completed,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleHint {
    Customer,
    Professional,
}

impl RoleHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleHint::Customer => "customer",
            RoleHint::Professional => "professional",
        }
    }
}

/// Where a user wants out-of-app notifications delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    #[default]
    Email,
    Telegram,
    Both,
    None,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Telegram => "telegram",
            NotificationChannel::Both => "both",
            NotificationChannel::None => "none",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "telegram" => NotificationChannel::Telegram,
            "both" => NotificationChannel::Both,
            "none" => NotificationChannel::None,
            _ => NotificationChannel::Email,
        }
    }
}
