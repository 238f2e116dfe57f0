use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::permissions::TaskPermissions;
use crate::domain::review_gate::BlockLevel;
use crate::models::task::{PendingReviewTask, Task};
use crate::services::task_service::TaskList;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTaskPayload {
    #[validate(length(min = 5, max = 200))]
    pub title: String,
    #[validate(length(min = 20, max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 80))]
    pub category: String,
    pub subcategory: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    #[validate(length(min = 1, max = 120))]
    pub city: String,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 10))]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTaskPayload {
    #[validate(length(min = 5, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    #[validate(length(min = 1, max = 120))]
    pub city: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    #[validate(length(max = 10))]
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskReasonPayload {
    #[validate(length(max = 1000))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TaskListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub permissions: TaskPermissions,
}

impl TaskResponse {
    pub fn new(task: Task) -> crate::error::Result<Self> {
        let permissions = TaskPermissions::from(task.status()?);
        Ok(Self { task, permissions })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    pub items: Vec<TaskResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl TryFrom<TaskList> for TaskListResponse {
    type Error = crate::error::Error;

    fn try_from(value: TaskList) -> Result<Self, Self::Error> {
        Ok(Self {
            items: value
                .items
                .into_iter()
                .map(TaskResponse::new)
                .collect::<Result<_, _>>()?,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CanCreateTaskResponse {
    pub can_create: bool,
    pub block_level: BlockLevel,
    pub pending_count: i64,
    pub pending_tasks: Vec<PendingReviewTask>,
}
