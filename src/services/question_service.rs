use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::lifecycle::{transition, Actor, TaskAction};
use crate::error::{Error, Result};
use crate::models::question::TaskQuestion;
use crate::models::task::Task;
use crate::services::notification_service::{NotificationEvent, NotificationService};
use crate::services::templates::NotificationKind;
use crate::services::user_service::ensure_active_account;

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
    notifications: NotificationService,
}

impl QuestionService {
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    /// Anyone but the customer may ask while the task is open or in progress.
    pub async fn ask(&self, task_id: Uuid, author_id: Uuid, question: &str) -> Result<TaskQuestion> {
        ensure_active_account(&self.pool, author_id).await?;
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Task not found".into()))?;

        let actor = match task.actor(author_id) {
            Some(Actor::Customer) => Actor::Customer,
            _ => Actor::Professional,
        };
        transition(task.status()?, TaskAction::AskQuestion, actor)?;

        let created = sqlx::query_as::<_, TaskQuestion>(
            r#"
            INSERT INTO task_questions (task_id, author_id, question)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(author_id)
        .bind(question.trim())
        .fetch_one(&self.pool)
        .await?;

        self.notifications.notify(
            NotificationEvent::for_task(&task, task.customer_id, NotificationKind::QuestionAsked)
                .by(author_id)
                .with("question", created.question.as_str()),
        );
        Ok(created)
    }

    pub async fn list(&self, task_id: Uuid) -> Result<Vec<TaskQuestion>> {
        let questions = sqlx::query_as::<_, TaskQuestion>(
            "SELECT * FROM task_questions WHERE task_id = $1 ORDER BY created_at ASC",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn answer(&self, question_id: Uuid, user_id: Uuid, answer: &str) -> Result<TaskQuestion> {
        ensure_active_account(&self.pool, user_id).await?;
        let question = sqlx::query_as::<_, TaskQuestion>("SELECT * FROM task_questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Question not found".into()))?;

        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(question.task_id)
            .fetch_one(&self.pool)
            .await?;
        if task.customer_id != user_id {
            return Err(Error::Forbidden("Only the task owner can answer questions".into()));
        }

        let answered = sqlx::query_as::<_, TaskQuestion>(
            r#"
            UPDATE task_questions
            SET answer = $2, answered_at = NOW()
            WHERE id = $1 AND answer IS NULL
            RETURNING *
            "#,
        )
        .bind(question_id)
        .bind(answer.trim())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Conflict("Question has already been answered".into()))?;

        self.notifications.notify(
            NotificationEvent::for_task(&task, answered.author_id, NotificationKind::QuestionAnswered)
                .by(user_id),
        );
        Ok(answered)
    }
}
