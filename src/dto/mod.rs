pub mod application_dto;
pub mod auth_dto;
pub mod notification_dto;
pub mod profile_dto;
pub mod question_dto;
pub mod review_dto;
pub mod task_dto;
