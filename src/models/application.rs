use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::lifecycle::{ApplicationStatus, LifecycleError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub task_id: Uuid,
    pub professional_id: Uuid,
    pub proposed_price: Decimal,
    pub message: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub fn status(&self) -> Result<ApplicationStatus, LifecycleError> {
        self.status.parse()
    }
}

/// Application joined with the applicant's public profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationWithProfessional {
    pub id: Uuid,
    pub task_id: Uuid,
    pub professional_id: Uuid,
    pub proposed_price: Decimal,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub professional_name: String,
    pub professional_rating: Option<f64>,
    pub professional_reviews: i32,
}
