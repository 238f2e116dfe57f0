use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const CUSTOMER_TO_PROFESSIONAL: &str = "customer_to_professional";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: Uuid,
    pub task_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub review_type: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PublishedReview {
    pub id: Uuid,
    pub task_id: Uuid,
    pub task_title: String,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub published_at: DateTime<Utc>,
}
