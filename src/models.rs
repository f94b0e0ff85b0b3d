pub mod auth;
pub mod catalog;
pub mod erp;
pub mod kyc;
pub mod rbac;
pub mod zoho;
