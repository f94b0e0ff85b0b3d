pub mod auth;
pub mod privilege;
