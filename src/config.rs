use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub webapp_url: String,
    pub api_public_url: String,
    pub public_rps: u32,
    pub api_rps: u32,
    pub telegram_bot_token: String,
    pub telegram_bot_username: String,
    pub telegram_webhook_secret: Option<String>,
    pub resend_api_key: Option<String>,
    pub email_from: String,
    pub deepl_api_key: Option<String>,
    pub deepl_api_url: String,
    pub deepl_monthly_char_limit: i64,
    pub review_publish_delay_hours: i32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let webapp_url = get_env("WEBAPP_URL")?;
        let api_public_url = get_optional("API_PUBLIC_URL").unwrap_or_else(|| webapp_url.clone());

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_parse_or("JWT_TTL_HOURS", 168)?,
            webapp_url,
            api_public_url,
            public_rps: get_env_parse("PUBLIC_RPS")?,
            api_rps: get_env_parse("API_RPS")?,
            telegram_bot_token: get_env("TELEGRAM_BOT_TOKEN")?,
            telegram_bot_username: env::var("TELEGRAM_BOT_USERNAME")
                .unwrap_or_else(|_| "TrudifyBot".to_string()),
            telegram_webhook_secret: get_optional("TELEGRAM_WEBHOOK_SECRET"),
            resend_api_key: get_optional("RESEND_API_KEY"),
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "Trudify <noreply@trudify.com>".to_string()),
            deepl_api_key: get_optional("DEEPL_API_KEY"),
            deepl_api_url: env::var("DEEPL_API_URL")
                .unwrap_or_else(|_| "https://api-free.deepl.com/v2/translate".to_string()),
            deepl_monthly_char_limit: get_env_parse_or("DEEPL_MONTHLY_CHAR_LIMIT", 500_000)?,
            review_publish_delay_hours: get_env_parse_or("REVIEW_PUBLISH_DELAY_HOURS", 0)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_rejects_out_of_range_values() {
        env::set_var("TRUDIFY_TEST_DELAY_HOURS", "99999999999");
        assert!(matches!(
            get_env_parse_or::<i32>("TRUDIFY_TEST_DELAY_HOURS", 0),
            Err(Error::Config(_))
        ));
        env::set_var("TRUDIFY_TEST_DELAY_HOURS", "72");
        assert_eq!(get_env_parse_or::<i32>("TRUDIFY_TEST_DELAY_HOURS", 0).unwrap(), 72);
        assert_eq!(get_env_parse_or::<i32>("TRUDIFY_TEST_DELAY_UNSET", 5).unwrap(), 5);
    }
}
