pub mod application_service;
pub mod email_service;
pub mod notification_service;
pub mod question_service;
pub mod review_service;
pub mod scheduler;
pub mod task_service;
pub mod telegram_service;
pub mod templates;
pub mod translation_service;
pub mod user_service;
