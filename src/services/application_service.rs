use axum::http::StatusCode;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::lifecycle::{transition, Actor, ApplicationStatus, TaskAction};
use crate::dto::application_dto::CreateApplicationPayload;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationWithProfessional};
use crate::models::task::Task;
use crate::services::notification_service::{NotificationEvent, NotificationService};
use crate::services::task_service::{lock_task, participant};
use crate::services::templates::NotificationKind;
use crate::services::user_service::ensure_active_account;

fn ensure_application_transition(application: &Application, next: ApplicationStatus) -> Result<()> {
    let current = application.status()?;
    if current.can_become(next) {
        Ok(())
    } else {
        Err(Error::domain(
            StatusCode::CONFLICT,
            "invalid_application_status",
            format!("Application is {} and cannot become {}", current, next),
        ))
    }
}

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    notifications: NotificationService,
}

impl ApplicationService {
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    pub async fn apply(
        &self,
        task_id: Uuid,
        professional_id: Uuid,
        payload: CreateApplicationPayload,
    ) -> Result<Application> {
        if payload.proposed_price <= Decimal::ZERO {
            return Err(Error::BadRequest("proposed_price must be positive".into()));
        }

        let mut tx = self.pool.begin().await?;
        ensure_active_account(&mut *tx, professional_id).await?;
        let task = lock_task(&mut tx, task_id).await?;
        if task.customer_id == professional_id {
            return Err(Error::domain(
                StatusCode::FORBIDDEN,
                "own_task",
                "You cannot apply to your own task",
            ));
        }
        transition(task.status()?, TaskAction::Apply, Actor::Professional)?;

        let already_applied = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM applications
                WHERE task_id = $1 AND professional_id = $2 AND status IN ('pending', 'accepted')
            )
            "#,
        )
        .bind(task_id)
        .bind(professional_id)
        .fetch_one(&mut *tx)
        .await?;
        if already_applied {
            return Err(Error::Conflict("You have already applied to this task".into()));
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (task_id, professional_id, proposed_price, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(professional_id)
        .bind(payload.proposed_price)
        .bind(payload.message.as_deref().map(str::trim).filter(|m| !m.is_empty()))
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(application_id = %application.id, %task_id, "application submitted");
        self.notifications.notify(
            NotificationEvent::for_task(&task, task.customer_id, NotificationKind::ApplicationReceived)
                .by(professional_id)
                .with("price", application.proposed_price.to_string()),
        );
        Ok(application)
    }

    /// Applications on a task, visible to its customer only.
    pub async fn list_for_task(
        &self,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<ApplicationWithProfessional>> {
        let customer_id = sqlx::query_scalar::<_, Uuid>("SELECT customer_id FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Task not found".into()))?;
        if customer_id != user_id {
            return Err(Error::Forbidden("Only the task owner can see applications".into()));
        }

        let applications = sqlx::query_as::<_, ApplicationWithProfessional>(
            r#"
            SELECT
                a.id,
                a.task_id,
                a.professional_id,
                a.proposed_price,
                a.message,
                a.status,
                a.created_at,
                u.full_name AS professional_name,
                u.average_rating AS professional_rating,
                u.total_reviews AS professional_reviews
            FROM applications a
            JOIN users u ON u.id = a.professional_id
            WHERE a.task_id = $1
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    pub async fn list_for_professional(&self, professional_id: Uuid) -> Result<Vec<Application>> {
        let applications = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE professional_id = $1 ORDER BY created_at DESC",
        )
        .bind(professional_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(applications)
    }

    /// Task first, then the application, so concurrent accepts serialize on the task row.
    async fn lock_application(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(Task, Application)> {
        let task_id = sqlx::query_scalar::<_, Uuid>("SELECT task_id FROM applications WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".into()))?;
        let task = lock_task(tx, task_id).await?;

        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_one(&mut **tx)
                .await?;
        Ok((task, application))
    }

    pub async fn accept(&self, id: Uuid, user_id: Uuid) -> Result<Application> {
        let mut tx = self.pool.begin().await?;
        let (task, application) = self.lock_application(&mut tx, id).await?;
        let actor = participant(&task, user_id)?;
        let next = transition(task.status()?, TaskAction::AcceptApplication, actor)?;
        ensure_application_transition(&application, ApplicationStatus::Accepted)?;

        let accepted = sqlx::query_as::<_, Application>(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ApplicationStatus::Accepted.as_str())
        .fetch_one(&mut *tx)
        .await?;

        let rejected = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE applications
            SET status = $3, rejection_reason = 'another_application_accepted', updated_at = NOW()
            WHERE task_id = $1 AND id <> $2 AND status = $4
            RETURNING professional_id
            "#,
        )
        .bind(task.id)
        .bind(id)
        .bind(ApplicationStatus::Rejected.as_str())
        .bind(ApplicationStatus::Pending.as_str())
        .fetch_all(&mut *tx)
        .await?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = $2, professional_id = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(next.as_str())
        .bind(accepted.professional_id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            application_id = %id,
            task_id = %task.id,
            rejected = rejected.len(),
            "application accepted"
        );
        self.notifications.notify(
            NotificationEvent::for_task(&task, accepted.professional_id, NotificationKind::ApplicationAccepted)
                .by(user_id)
                .with("price", accepted.proposed_price.to_string()),
        );
        for professional_id in rejected {
            self.notifications.notify(
                NotificationEvent::for_task(&task, professional_id, NotificationKind::ApplicationRejected)
                    .by(user_id),
            );
        }
        Ok(accepted)
    }

    pub async fn reject(&self, id: Uuid, user_id: Uuid, reason: Option<String>) -> Result<Application> {
        let mut tx = self.pool.begin().await?;
        let (task, application) = self.lock_application(&mut tx, id).await?;
        if task.actor(user_id) != Some(Actor::Customer) {
            return Err(Error::Forbidden("Only the task owner can reject applications".into()));
        }
        ensure_application_transition(&application, ApplicationStatus::Rejected)?;

        let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        let rejected = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $2, rejection_reason = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ApplicationStatus::Rejected.as_str())
        .bind(&reason)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        let mut event =
            NotificationEvent::for_task(&task, rejected.professional_id, NotificationKind::ApplicationRejected)
                .by(user_id);
        if let Some(reason) = &reason {
            event = event.with("reason", reason.as_str());
        }
        self.notifications.notify(event);
        Ok(rejected)
    }

    pub async fn withdraw(&self, id: Uuid, user_id: Uuid) -> Result<Application> {
        let mut tx = self.pool.begin().await?;
        let (task, application) = self.lock_application(&mut tx, id).await?;
        if application.professional_id != user_id {
            return Err(Error::Forbidden("You can only withdraw your own applications".into()));
        }
        ensure_application_transition(&application, ApplicationStatus::Withdrawn)?;

        let withdrawn = sqlx::query_as::<_, Application>(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(ApplicationStatus::Withdrawn.as_str())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.notifications.notify(
            NotificationEvent::for_task(&task, task.customer_id, NotificationKind::ApplicationWithdrawn)
                .by(user_id),
        );
        Ok(withdrawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn application(status: &str) -> Application {
        Application {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            proposed_price: Decimal::new(150, 0),
            message: None,
            status: status.to_string(),
            rejection_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn only_pending_applications_can_be_withdrawn() {
        assert!(ensure_application_transition(&application("pending"), ApplicationStatus::Withdrawn).is_ok());

        let err = ensure_application_transition(&application("accepted"), ApplicationStatus::Withdrawn)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Domain { code: "invalid_application_status", .. }
        ));
    }

    #[test]
    fn rejected_application_cannot_be_accepted() {
        assert!(ensure_application_transition(&application("rejected"), ApplicationStatus::Accepted).is_err());
    }
}
