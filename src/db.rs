pub mod user_repo;
pub use user_repo::UserRepository;
pub mod security_repo;
pub use security_repo::SecurityRepository;
pub mod session_repo;
pub use session_repo::SessionRepository;
pub mod rbac_repo;
pub use rbac_repo::RbacRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
pub mod kyc_repo;
pub use kyc_repo::KycRepository;
pub mod erp_repo;
pub use erp_repo::ErpRepository;
