use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::locale::Locale;
use crate::models::user::{RoleHint, User};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignupPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    pub role_hint: Option<RoleHint>,
    pub preferred_language: Option<Locale>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Fields posted by the Telegram Login Widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramLoginPayload {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}
