use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::lifecycle::{Actor, LifecycleError, TaskStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub professional_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub title_bg: Option<String>,
    pub description_bg: Option<String>,
    pub source_language: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub city: String,
    pub status: String,
    pub deadline: Option<DateTime<Utc>>,
    pub images: Vec<String>,
    pub cancellation_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn status(&self) -> Result<TaskStatus, LifecycleError> {
        self.status.parse()
    }

    /// The caller's role on this task, if any.
    pub fn actor(&self, user_id: Uuid) -> Option<Actor> {
        if self.customer_id == user_id {
            Some(Actor::Customer)
        } else if self.professional_id == Some(user_id) {
            Some(Actor::Professional)
        } else {
            None
        }
    }
}

/// Completed task still waiting for the customer's review.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingReviewTask {
    pub task_id: Uuid,
    pub title: String,
    pub professional_id: Option<Uuid>,
    pub professional_name: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}
