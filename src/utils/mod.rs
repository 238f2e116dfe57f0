pub mod crypto;
pub mod telegram_auth;
pub mod token;
