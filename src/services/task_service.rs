use axum::http::StatusCode;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::lifecycle::{transition, Actor, ApplicationStatus, TaskAction, TaskStatus};
use crate::domain::locale::Locale;
use crate::dto::task_dto::{CreateTaskPayload, TaskListQuery, UpdateTaskPayload};
use crate::error::{Error, Result};
use crate::models::task::Task;
use crate::services::notification_service::{NotificationEvent, NotificationService};
use crate::services::review_service::ReviewService;
use crate::services::templates::NotificationKind;
use crate::services::translation_service::TranslationService;
use crate::services::user_service::ensure_active_account;

pub struct TaskList {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Escapes `ILIKE` wildcards so user input matches literally under `ESCAPE '\'`.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn check_budget(min: Option<Decimal>, max: Option<Decimal>) -> Result<()> {
    if min.is_some_and(|m| m < Decimal::ZERO) || max.is_some_and(|m| m < Decimal::ZERO) {
        return Err(Error::BadRequest("Budget cannot be negative".into()));
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(Error::BadRequest(
                "budget_min must not exceed budget_max".into(),
            ));
        }
    }
    Ok(())
}

/// Locks the task row for the rest of the transaction.
pub(crate) async fn lock_task(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Task> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| Error::NotFound("Task not found".into()))
}

pub(crate) fn participant(task: &Task, user_id: Uuid) -> Result<Actor> {
    task.actor(user_id)
        .ok_or_else(|| Error::Forbidden("You are not a participant of this task".into()))
}

/// The other side of the task from `actor`'s point of view.
fn counterpart(task: &Task, actor: Actor) -> Option<Uuid> {
    match actor {
        Actor::Customer => task.professional_id,
        Actor::Professional => Some(task.customer_id),
    }
}

#[derive(Clone)]
pub struct TaskService {
    pool: PgPool,
    reviews: ReviewService,
    notifications: NotificationService,
    translations: TranslationService,
}

impl TaskService {
    pub fn new(
        pool: PgPool,
        reviews: ReviewService,
        notifications: NotificationService,
        translations: TranslationService,
    ) -> Self {
        Self {
            pool,
            reviews,
            notifications,
            translations,
        }
    }

    pub async fn create(
        &self,
        customer_id: Uuid,
        payload: CreateTaskPayload,
        locale: Locale,
    ) -> Result<Task> {
        ensure_active_account(&self.pool, customer_id).await?;
        check_budget(payload.budget_min, payload.budget_max)?;

        let gate = self.reviews.gate(customer_id).await?;
        if !gate.can_create {
            return Err(Error::domain(
                StatusCode::FORBIDDEN,
                "review_hard_block",
                format!(
                    "Review your {} completed task(s) before posting a new one",
                    gate.pending_count
                ),
            ));
        }

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (
                customer_id, title, description, source_language, category, subcategory,
                budget_min, budget_max, city, deadline, images
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(payload.title.trim())
        .bind(payload.description.trim())
        .bind(locale.as_str())
        .bind(payload.category.trim())
        .bind(&payload.subcategory)
        .bind(payload.budget_min)
        .bind(payload.budget_max)
        .bind(payload.city.trim())
        .bind(payload.deadline)
        .bind(&payload.images)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(task_id = %task.id, %customer_id, "task created");
        self.translations.translate_task_in_background(task.id);
        Ok(task)
    }

    pub async fn list_open(&self, query: TaskListQuery) -> Result<TaskList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let mut filters = vec!["status = 'open'".to_string()];
        let mut args: Vec<String> = Vec::new();

        if let Some(category) = query.category.filter(|c| !c.trim().is_empty()) {
            filters.push(format!("category = ${}", args.len() + 1));
            args.push(category);
        }
        if let Some(city) = query.city.filter(|c| !c.trim().is_empty()) {
            filters.push(format!("city ILIKE ${} ESCAPE '\\'", args.len() + 1));
            args.push(escape_like(city.trim()));
        }
        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            let idx = args.len() + 1;
            filters.push(format!(
                "(title ILIKE ${idx} ESCAPE '\\' OR description ILIKE ${idx} ESCAPE '\\' \
                 OR title_bg ILIKE ${idx} ESCAPE '\\')"
            ));
            args.push(format!("%{}%", escape_like(search.trim())));
        }

        let where_clause = format!("WHERE {}", filters.join(" AND "));
        let items_query = format!(
            "SELECT * FROM tasks {} ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            where_clause,
            args.len() + 1,
            args.len() + 2
        );
        let total_query = format!("SELECT COUNT(*) FROM tasks {}", where_clause);

        let mut items_statement = sqlx::query_as::<_, Task>(&items_query);
        for value in &args {
            items_statement = items_statement.bind(value);
        }
        let items = items_statement
            .bind(per_page)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let mut total_statement = sqlx::query_scalar::<_, i64>(&total_query);
        for value in &args {
            total_statement = total_statement.bind(value);
        }
        let total = total_statement.fetch_one(&self.pool).await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(TaskList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn get(&self, id: Uuid) -> Result<Task> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Task not found".into()))
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn list_for_professional(&self, professional_id: Uuid) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE professional_id = $1 ORDER BY updated_at DESC",
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn update(
        &self,
        id: Uuid,
        user_id: Uuid,
        payload: UpdateTaskPayload,
        locale: Locale,
    ) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        ensure_active_account(&mut *tx, user_id).await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        transition(task.status()?, TaskAction::Edit, actor)?;

        check_budget(
            payload.budget_min.or(task.budget_min),
            payload.budget_max.or(task.budget_max),
        )?;
        let text_changed = payload.title.is_some() || payload.description.is_some();

        let updated = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                subcategory = COALESCE($5, subcategory),
                budget_min = COALESCE($6, budget_min),
                budget_max = COALESCE($7, budget_max),
                city = COALESCE($8, city),
                deadline = COALESCE($9, deadline),
                images = COALESCE($10, images),
                source_language = CASE WHEN $11 THEN $12 ELSE source_language END,
                title_bg = CASE WHEN $11 THEN NULL ELSE title_bg END,
                description_bg = CASE WHEN $11 THEN NULL ELSE description_bg END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.title.as_deref().map(str::trim))
        .bind(payload.description.as_deref().map(str::trim))
        .bind(payload.category.as_deref().map(str::trim))
        .bind(&payload.subcategory)
        .bind(payload.budget_min)
        .bind(payload.budget_max)
        .bind(payload.city.as_deref().map(str::trim))
        .bind(payload.deadline)
        .bind(&payload.images)
        .bind(text_changed)
        .bind(locale.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        if text_changed {
            self.translations.translate_task_in_background(updated.id);
        }
        Ok(updated)
    }

    /// Cancels the task, closing every live application on it.
    pub async fn cancel(&self, id: Uuid, user_id: Uuid, reason: Option<String>) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::Cancel, actor)?;

        let pending_applicants = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE applications
            SET status = $2, rejection_reason = 'task_cancelled', updated_at = NOW()
            WHERE task_id = $1 AND status = $3
            RETURNING professional_id
            "#,
        )
        .bind(id)
        .bind(ApplicationStatus::Rejected.as_str())
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_all(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE task_id = $1 AND status = $3",
        )
        .bind(id)
        .bind(ApplicationStatus::RemovedByCustomer.as_str())
        .bind(ApplicationStatus::Accepted.as_str())
        .execute(&mut *tx)
        .await?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let cancelled = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, cancellation_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(task_id = %id, "task cancelled");
        let recipients = task.professional_id.into_iter().chain(pending_applicants);
        for recipient in recipients {
            let mut event = NotificationEvent::for_task(&cancelled, recipient, NotificationKind::TaskCancelled)
                .by(user_id);
            if let Some(reason) = &reason {
                event = event.with("reason", reason.as_str());
            }
            self.notifications.notify(event);
        }
        Ok(cancelled)
    }

    pub async fn reopen(&self, id: Uuid, user_id: Uuid) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        ensure_active_account(&mut *tx, user_id).await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::Reopen, actor)?;

        let reopened = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, professional_id = NULL, cancellation_reason = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(task_id = %id, "task reopened");
        Ok(reopened)
    }

    /// One side reports the work done; the other side has to confirm.
    pub async fn mark_complete(&self, id: Uuid, user_id: Uuid) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::MarkComplete, actor)?;

        let updated = self.set_status(&mut tx, id, next).await?;
        tx.commit().await?;

        if let Some(recipient) = counterpart(&updated, actor) {
            self.notifications.notify(
                NotificationEvent::for_task(&updated, recipient, NotificationKind::CompletionRequested)
                    .by(user_id),
            );
        }
        Ok(updated)
    }

    pub async fn confirm_completion(&self, id: Uuid, user_id: Uuid) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::ConfirmCompletion, actor)?;

        let completed = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if let Some(professional_id) = completed.professional_id {
            sqlx::query(
                "UPDATE users SET tasks_completed = tasks_completed + 1, updated_at = NOW() WHERE id = $1",
            )
            .bind(professional_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(task_id = %id, "task completed");
        if let Some(recipient) = counterpart(&completed, actor) {
            self.notifications.notify(
                NotificationEvent::for_task(&completed, recipient, NotificationKind::TaskCompleted)
                    .by(user_id),
            );
        }
        Ok(completed)
    }

    pub async fn dispute(&self, id: Uuid, user_id: Uuid, reason: Option<String>) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::Dispute, actor)?;

        let disputed = self.set_status(&mut tx, id, next).await?;
        tx.commit().await?;

        tracing::warn!(task_id = %id, %actor, "task disputed");
        if let Some(recipient) = counterpart(&disputed, actor) {
            let mut event = NotificationEvent::for_task(&disputed, recipient, NotificationKind::TaskDisputed)
                .by(user_id);
            if let Some(reason) = reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
                event = event.with("reason", reason);
            }
            self.notifications.notify(event);
        }
        Ok(disputed)
    }

    /// Unassigns the professional and puts the task back on the market.
    pub async fn remove_professional(
        &self,
        id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
    ) -> Result<Task> {
        let mut tx = self.pool.begin().await?;
        let task = lock_task(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::RemoveProfessional, actor)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        sqlx::query(
            r#"
            UPDATE applications
            SET status = $2, rejection_reason = $4, updated_at = NOW()
            WHERE task_id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(ApplicationStatus::RemovedByCustomer.as_str())
        .bind(ApplicationStatus::Accepted.as_str())
        .bind(&reason)
        .execute(&mut *tx)
        .await?;

        let reopened = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, professional_id = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        if let Some(professional_id) = task.professional_id {
            tracing::info!(task_id = %id, %professional_id, "professional removed from task");
            let mut event =
                NotificationEvent::for_task(&reopened, professional_id, NotificationKind::RemovedFromTask)
                    .by(user_id);
            if let Some(reason) = &reason {
                event = event.with("reason", reason.as_str());
            }
            self.notifications.notify(event);
        }
        Ok(reopened)
    }

    async fn set_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "UPDATE tasks SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_bounds() {
        let d = |v: i64| Some(Decimal::new(v, 0));
        assert!(check_budget(d(10), d(20)).is_ok());
        assert!(check_budget(d(20), d(20)).is_ok());
        assert!(check_budget(None, d(5)).is_ok());
        assert!(matches!(check_budget(d(30), d(20)), Err(Error::BadRequest(_))));
        assert!(matches!(check_budget(d(-1), None), Err(Error::BadRequest(_))));
    }

    #[test]
    fn search_wildcards_match_literally() {
        assert_eq!(escape_like("sink"), "sink");
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }
}
