pub mod application;
pub mod notification;
pub mod question;
pub mod review;
pub mod task;
pub mod user;
