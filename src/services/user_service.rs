use axum::http::StatusCode;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::locale::Locale;
use crate::dto::auth_dto::{SignupPayload, TelegramLoginPayload};
use crate::dto::profile_dto::{
    DeletionBlocker, DeletionBlockerKind, DeletionPreflightResponse, UpdateProfilePayload,
};
use crate::error::{Error, Result};
use crate::models::user::{NotificationChannel, RoleHint, User};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::generate_access_token;

pub const LINK_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

/// Tokens outlive account deletion, so write paths re-check the account behind them.
pub(crate) async fn ensure_active_account<'e, E>(executor: E, user_id: Uuid) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    let active = sqlx::query_scalar::<_, bool>("SELECT deleted_at IS NULL FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    match active {
        Some(true) => Ok(()),
        _ => Err(Error::Unauthorized("Account has been deleted".into())),
    }
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn signup(&self, payload: SignupPayload) -> Result<User> {
        let email = payload.email.trim().to_lowercase();
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)",
        )
        .bind(&email)
        .fetch_one(&self.pool)
        .await?;
        if exists {
            return Err(Error::Conflict("An account with this email already exists".into()));
        }

        let password_hash = hash_password(&payload.password)?;
        let role = payload.role_hint.unwrap_or(RoleHint::Customer);
        let locale = payload.preferred_language.unwrap_or_default();

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role_hint, preferred_language)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(password_hash)
        .bind(payload.full_name.trim())
        .bind(role.as_str())
        .bind(locale.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "user signed up");
        Ok(user)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        match user {
            Some(user)
                if user
                    .password_hash
                    .as_deref()
                    .is_some_and(|hash| verify_password(password, hash)) =>
            {
                Ok(user)
            }
            _ => Err(Error::Unauthorized("Invalid email or password".into())),
        }
    }

    /// Finds the user behind a verified Telegram login, creating one on first sign-in.
    pub async fn upsert_telegram_user(
        &self,
        payload: &TelegramLoginPayload,
        locale: Locale,
    ) -> Result<User> {
        let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
            .bind(payload.id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(user) = existing {
            if user.is_deleted() {
                return Err(Error::Unauthorized("Account has been deleted".into()));
            }
            let user = sqlx::query_as::<_, User>(
                r#"
                UPDATE users SET telegram_username = $2, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(user.id)
            .bind(&payload.username)
            .fetch_one(&self.pool)
            .await?;
            return Ok(user);
        }

        let full_name = match &payload.last_name {
            Some(last) if !last.trim().is_empty() => format!("{} {}", payload.first_name, last),
            _ => payload.first_name.clone(),
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (full_name, telegram_id, telegram_username, preferred_language, notification_channel)
            VALUES ($1, $2, $3, $4, 'telegram')
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(payload.id)
        .bind(&payload.username)
        .bind(locale.as_str())
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, "user signed up with Telegram");
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    pub async fn get_active(&self, id: Uuid) -> Result<User> {
        let user = self.get(id).await?;
        if user.is_deleted() {
            return Err(Error::NotFound("User not found".into()));
        }
        Ok(user)
    }

    pub async fn update_profile(&self, id: Uuid, payload: UpdateProfilePayload) -> Result<User> {
        self.get_active(id).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                full_name = COALESCE($2, full_name),
                role_hint = COALESCE($3, role_hint),
                preferred_language = COALESCE($4, preferred_language),
                notification_channel = COALESCE($5, notification_channel),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(payload.full_name.as_deref().map(str::trim))
        .bind(payload.role_hint.map(|r| r.as_str()))
        .bind(payload.preferred_language.map(|l| l.as_str()))
        .bind(payload.notification_channel.map(|c| c.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn deletion_preflight(&self, id: Uuid) -> Result<DeletionPreflightResponse> {
        let mut blockers = Vec::new();

        let as_customer = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, title, status FROM tasks
            WHERE customer_id = $1 AND status NOT IN ('completed', 'cancelled')
            ORDER BY created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        blockers.extend(as_customer.into_iter().map(|(task_id, title, status)| DeletionBlocker {
            kind: DeletionBlockerKind::ActiveTaskAsCustomer,
            task_id,
            title,
            status,
        }));

        let as_professional = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, title, status FROM tasks
            WHERE professional_id = $1
              AND status IN ('in_progress', 'pending_professional_confirmation',
                             'pending_customer_confirmation', 'disputed')
            ORDER BY created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        blockers.extend(as_professional.into_iter().map(|(task_id, title, status)| DeletionBlocker {
            kind: DeletionBlockerKind::ActiveTaskAsProfessional,
            task_id,
            title,
            status,
        }));

        let pending = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT t.id, t.title, a.status
            FROM applications a
            JOIN tasks t ON t.id = a.task_id
            WHERE a.professional_id = $1 AND a.status = 'pending'
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        blockers.extend(pending.into_iter().map(|(task_id, title, status)| DeletionBlocker {
            kind: DeletionBlockerKind::PendingApplication,
            task_id,
            title,
            status,
        }));

        Ok(DeletionPreflightResponse {
            can_delete: blockers.is_empty(),
            blockers,
        })
    }

    /// Anonymizes the account. Reviews and finished tasks keep pointing at the row.
    pub async fn soft_delete(&self, id: Uuid) -> Result<()> {
        self.get_active(id).await?;

        let preflight = self.deletion_preflight(id).await?;
        if !preflight.can_delete {
            return Err(Error::domain(
                StatusCode::CONFLICT,
                "deletion_blocked",
                format!(
                    "Account has {} active task(s) or application(s)",
                    preflight.blockers.len()
                ),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM telegram_link_tokens WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE users
            SET email = NULL,
                password_hash = NULL,
                telegram_id = NULL,
                telegram_username = NULL,
                notification_channel = 'none',
                deleted_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(user_id = %id, "account deleted");
        Ok(())
    }

    pub async fn create_link_token(&self, user_id: Uuid) -> Result<String> {
        ensure_active_account(&self.pool, user_id).await?;
        let token = generate_access_token(32);
        let expires_at = Utc::now() + Duration::minutes(LINK_TOKEN_TTL_MINUTES);

        sqlx::query(
            "INSERT INTO telegram_link_tokens (token, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(token)
    }

    /// Links the chat to the token's owner. `None` for unknown or expired tokens.
    pub async fn consume_link_token(
        &self,
        token: &str,
        telegram_id: i64,
        telegram_username: Option<&str>,
    ) -> Result<Option<User>> {
        let mut tx = self.pool.begin().await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            DELETE FROM telegram_link_tokens
            WHERE token = $1 AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };

        // The chat may already belong to another account.
        sqlx::query(
            "UPDATE users SET telegram_id = NULL, telegram_username = NULL WHERE telegram_id = $1 AND id <> $2",
        )
        .bind(telegram_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET telegram_id = $2, telegram_username = $3, updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(telegram_id)
        .bind(telegram_username)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        if let Some(user) = &user {
            tracing::info!(user_id = %user.id, "Telegram account linked");
        }
        Ok(user)
    }

    pub async fn unlink_telegram(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET telegram_id = NULL,
                telegram_username = NULL,
                notification_channel = CASE
                    WHEN notification_channel IN ('telegram', 'both') THEN $2
                    ELSE notification_channel
                END,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(NotificationChannel::Email.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".into()))?;
        Ok(user)
    }

    pub async fn find_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE telegram_id = $1 AND deleted_at IS NULL",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn delete_expired_link_tokens(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM telegram_link_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
