use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::locale::Locale;
use crate::models::user::{NotificationChannel, PublicUser, RoleHint};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    pub role_hint: Option<RoleHint>,
    pub preferred_language: Option<Locale>,
    pub notification_channel: Option<NotificationChannel>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeletionBlockerKind {
    ActiveTaskAsCustomer,
    ActiveTaskAsProfessional,
    PendingApplication,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionBlocker {
    pub kind: DeletionBlockerKind,
    pub task_id: Uuid,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeletionPreflightResponse {
    pub can_delete: bool,
    pub blockers: Vec<DeletionBlocker>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicProfileResponse {
    #[serde(flatten)]
    pub user: PublicUser,
}
