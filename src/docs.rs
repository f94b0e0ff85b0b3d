// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::token,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::request_password_reset,
        handlers::auth::reset_password,
        handlers::auth::send_otp,
        handlers::auth::verify_otp,
        handlers::auth::setup_totp,

        // --- Users ---
        handlers::auth::get_me,
        handlers::auth::logout,

        // --- Registration ---
        handlers::register::send_otp,
        handlers::register::verify_otp,
        handlers::register::register_user,

        // --- RBAC ---
        handlers::rbac::list_modules,
        handlers::rbac::list_roles,
        handlers::rbac::create_role,
        handlers::rbac::set_privileges,
        handlers::rbac::assign_role,

        // --- Catalog ---
        handlers::catalog::list_products,
        handlers::catalog::create_product,
        handlers::catalog::search_products,
        handlers::catalog::export_products,
        handlers::catalog::list_countries,
        handlers::catalog::delete_country,
        handlers::catalog::list_categories,
        handlers::catalog::delete_category,

        // --- KYC ---
        handlers::kyc::get_kyc_status,

        // --- ERP ---
        handlers::erp::sync_vendors,
        handlers::erp::sync_products,
        handlers::erp::sync_ombasic,
        handlers::erp::sync_vendor_documents,
        handlers::erp::sync_branchmast,

        // --- Files ---
        handlers::files::get_file,

        // --- Zoho ---
        handlers::zoho::list_quote_comments,
        handlers::zoho::add_quote_comment,
        handlers::zoho::zoho_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::User,
            models::auth::LoginUserPayload,
            models::auth::TokenForm,
            models::auth::RefreshTokenPayload,
            models::auth::LogoutPayload,
            models::auth::PasswordResetRequestPayload,
            models::auth::ResetPasswordPayload,
            models::auth::OtpSendPayload,
            models::auth::OtpVerifyPayload,
            models::auth::RegisterOtpPayload,
            models::auth::RegisterVerifyPayload,
            models::auth::RegisterUserPayload,
            models::auth::TokenResponse,
            models::auth::LoginResponse,
            models::auth::MessageResponse,
            models::auth::TotpSetupResponse,

            // --- RBAC ---
            models::rbac::Role,
            models::rbac::Module,
            models::rbac::RoleModulePrivilege,
            models::rbac::PrivilegeAction,
            models::rbac::CreateRolePayload,
            models::rbac::SetPrivilegesPayload,
            models::rbac::RoleAssignment,

            // --- Catalog ---
            models::catalog::Product,
            models::catalog::CreateProductPayload,
            models::catalog::ProductSearchPayload,
            models::catalog::CompanyProduct,
            models::catalog::Country,
            models::catalog::CategoryMaster,
            models::catalog::CategoryDetail,

            // --- KYC ---
            models::kyc::KycReport,

            // --- ERP ---
            models::erp::PartyRecord,
            models::erp::PartyMast,
            models::erp::ItemMasterRecord,
            models::erp::ItemMaster,
            models::erp::OmBasicRecord,
            models::erp::OmBasic,
            models::erp::VendorBundle,
            models::erp::VendorDocuments,
            models::erp::VendorDocument,
            models::erp::BranchMastRecord,
            models::erp::BranchMast,

            // --- Zoho ---
            models::zoho::CommentView,
            models::zoho::AddCommentPayload,
        )
    ),
    tags(
        (name = "Auth", description = "Login, Tokens, Senha e OTP"),
        (name = "Users", description = "Dados do Usuário Autenticado"),
        (name = "Registration", description = "Cadastro com Confirmação por Código"),
        (name = "RBAC", description = "Papéis, Módulos e Privilégios"),
        (name = "Catalog", description = "Produtos, Países e Categorias de Documento"),
        (name = "KYC", description = "Situação Cadastral do Fornecedor"),
        (name = "ERP", description = "Exportações para o ERP"),
        (name = "Files", description = "Download de Documentos"),
        (name = "Zoho", description = "Comentários de Cotação e Webhooks")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented_with_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/token"));
        assert!(doc.paths.paths.contains_key("/products/search"));
        assert!(doc.paths.paths.contains_key("/erp/sync_vendor_documents"));
        assert!(doc.paths.paths.contains_key("/webhooks/zoho/{module}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
    }
}
