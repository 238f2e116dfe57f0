use chrono::{DateTime, Datelike, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::locale::Locale;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
}

/// Whether `requested` more characters fit into the monthly allowance.
pub fn quota_allows(used: i64, requested: i64, limit: i64) -> bool {
    used.saturating_add(requested) <= limit
}

/// `app_settings` key holding the character count for the month of `now`.
pub fn usage_key(now: DateTime<Utc>) -> String {
    format!("deepl_usage:{:04}-{:02}", now.year(), now.month())
}

#[derive(Clone)]
pub struct TranslationService {
    pool: PgPool,
    client: Client,
    api_key: Option<String>,
    api_url: String,
    monthly_limit: i64,
}

impl TranslationService {
    pub fn new(
        pool: PgPool,
        client: Client,
        api_key: Option<String>,
        api_url: String,
        monthly_limit: i64,
    ) -> Self {
        Self {
            pool,
            client,
            api_key,
            api_url,
            monthly_limit,
        }
    }

    /// Fills `title_bg`/`description_bg` for a task in the background.
    pub fn translate_task_in_background(&self, task_id: Uuid) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(err) = service.translate_task(task_id).await {
                tracing::warn!(%task_id, error = ?err, "task translation failed");
            }
        });
    }

    pub async fn translate_task(&self, task_id: Uuid) -> Result<()> {
        let (title, description, source_language) = sqlx::query_as::<_, (String, String, String)>(
            "SELECT title, description, source_language FROM tasks WHERE id = $1",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        let source = Locale::from_tag(&source_language).unwrap_or_default();
        let translated = if source == Locale::Bg {
            Some((title.clone(), description.clone()))
        } else {
            self.translate_to_bulgarian(source, &title, &description)
                .await?
        };

        let Some((title_bg, description_bg)) = translated else {
            return Ok(());
        };

        if self
            .store_translation(task_id, &title, &description, &title_bg, &description_bg)
            .await?
        {
            tracing::info!(%task_id, source = %source, "task translated to Bulgarian");
        } else {
            tracing::debug!(%task_id, "task text changed during translation, dropping result");
        }
        Ok(())
    }

    /// Writes the Bulgarian text only while the task still holds the source it was made from.
    /// Returns `false` when an edit landed in between.
    pub async fn store_translation(
        &self,
        task_id: Uuid,
        source_title: &str,
        source_description: &str,
        title_bg: &str,
        description_bg: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title_bg = $2, description_bg = $3, updated_at = NOW()
            WHERE id = $1 AND title = $4 AND description = $5
            "#,
        )
        .bind(task_id)
        .bind(title_bg)
        .bind(description_bg)
        .bind(source_title)
        .bind(source_description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns `None` when translation is unavailable: no key or no quota left.
    async fn translate_to_bulgarian(
        &self,
        source: Locale,
        title: &str,
        description: &str,
    ) -> Result<Option<(String, String)>> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::warn!("DEEPL_API_KEY not set, skipping translation");
            return Ok(None);
        };

        let requested = (title.chars().count() + description.chars().count()) as i64;
        let key = usage_key(Utc::now());
        let used = self.characters_used(&key).await?;
        if !quota_allows(used, requested, self.monthly_limit) {
            tracing::warn!(
                used,
                requested,
                limit = self.monthly_limit,
                "DeepL monthly quota exhausted, skipping translation"
            );
            return Ok(None);
        }

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("DeepL-Auth-Key {}", api_key))
            .json(&json!({
                "text": [title, description],
                "source_lang": source.deepl_code(),
                "target_lang": Locale::Bg.deepl_code(),
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!("DeepL returned {}: {}", status, body)));
        }

        let parsed: DeepLResponse = response.json().await?;
        let mut texts = parsed.translations.into_iter().map(|t| t.text);
        let (Some(title_bg), Some(description_bg)) = (texts.next(), texts.next()) else {
            return Err(Error::Internal("DeepL returned fewer translations than requested".into()));
        };

        self.record_usage(&key, requested).await?;
        Ok(Some((title_bg, description_bg)))
    }

    async fn characters_used(&self, key: &str) -> Result<i64> {
        let used = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT (value->>'characters')::bigint FROM app_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?
        .flatten()
        .unwrap_or(0);
        Ok(used)
    }

    async fn record_usage(&self, key: &str, characters: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO app_settings (key, value, updated_at)
            VALUES ($1, jsonb_build_object('characters', $2::bigint), NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = jsonb_build_object(
                    'characters',
                    COALESCE((app_settings.value->>'characters')::bigint, 0) + $2::bigint
                ),
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(characters)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn quota_boundary() {
        assert!(quota_allows(0, 500, 500));
        assert!(!quota_allows(1, 500, 500));
        assert!(!quota_allows(i64::MAX, 1, 500));
    }

    #[test]
    fn usage_is_tracked_per_month() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(usage_key(now), "deepl_usage:2026-03");
    }
}
