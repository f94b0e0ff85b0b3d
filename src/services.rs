pub mod auth;
pub mod catalog_service;
pub mod comment_meta;
pub mod erp_service;
pub mod file_service;
pub mod kyc_service;
pub mod mailer;
pub mod otp_policy;
pub mod otp_service;
pub mod password;
pub mod rbac_service;
pub mod registration;
pub mod response_cache;
pub mod token;
pub mod totp;
pub mod zoho_client;
pub mod zoho_token;
