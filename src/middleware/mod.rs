pub mod auth;
pub mod cors;
pub mod locale;
pub mod rate_limit;
