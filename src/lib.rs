pub mod config;
pub mod database;
pub mod domain;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    application_service::ApplicationService,
    email_service::EmailService,
    notification_service::{Dispatcher, NotificationService},
    question_service::QuestionService,
    review_service::ReviewService,
    task_service::TaskService,
    telegram_service::TelegramService,
    translation_service::TranslationService,
    user_service::UserService,
};
use reqwest::Client;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub user_service: UserService,
    pub task_service: TaskService,
    pub application_service: ApplicationService,
    pub review_service: ReviewService,
    pub question_service: QuestionService,
    pub notification_service: NotificationService,
    pub telegram_service: TelegramService,
}

impl AppState {
    pub fn new(pool: PgPool, http_client: Client, config: &Config) -> Self {
        let telegram_service = TelegramService::new(
            http_client.clone(),
            config.telegram_bot_token.clone(),
            config.telegram_bot_username.clone(),
        );
        let email_service = EmailService::new(
            http_client.clone(),
            config.resend_api_key.clone(),
            config.email_from.clone(),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(telegram_service.clone()),
            Arc::new(email_service),
        );
        let notification_service =
            NotificationService::new(pool.clone(), dispatcher, config.webapp_url.clone());
        let translation_service = TranslationService::new(
            pool.clone(),
            http_client,
            config.deepl_api_key.clone(),
            config.deepl_api_url.clone(),
            config.deepl_monthly_char_limit,
        );

        let user_service = UserService::new(pool.clone());
        let review_service = ReviewService::new(
            pool.clone(),
            notification_service.clone(),
            config.review_publish_delay_hours,
        );
        let task_service = TaskService::new(
            pool.clone(),
            review_service.clone(),
            notification_service.clone(),
            translation_service,
        );
        let application_service =
            ApplicationService::new(pool.clone(), notification_service.clone());
        let question_service = QuestionService::new(pool.clone(), notification_service.clone());

        Self {
            pool,
            user_service,
            task_service,
            application_service,
            review_service,
            question_service,
            notification_service,
            telegram_service,
        }
    }
}
