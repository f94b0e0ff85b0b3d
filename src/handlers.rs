pub mod auth;
pub mod catalog;
pub mod erp;
pub mod files;
pub mod kyc;
pub mod rbac;
pub mod register;
pub mod zoho;
