pub mod lifecycle;
pub mod locale;
pub mod permissions;
pub mod review_gate;
