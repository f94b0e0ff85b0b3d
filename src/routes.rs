// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_middleware};

pub fn build_router(app_state: AppState) -> Router {
    // Autenticação / sessão
    let auth_routes = Router::new()
        .route("/token", post(handlers::auth::token))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/request-password-reset", post(handlers::auth::request_password_reset))
        .route("/auth/reset-password", post(handlers::auth::reset_password))
        .route("/auth/otp/send", post(handlers::auth::send_otp))
        .route("/auth/otp/verify", post(handlers::auth::verify_otp))
        .route("/auth/totp/setup", post(handlers::auth::setup_totp))
        .route("/users/me", get(handlers::auth::get_me))
        .route("/users/logout", post(handlers::auth::logout));

    let register_routes = Router::new()
        .route("/register/send-otp", post(handlers::register::send_otp))
        .route("/register/verify-otp", post(handlers::register::verify_otp))
        .route("/register/user", post(handlers::register::register_user));

    let rbac_routes = Router::new()
        .route("/modules/", get(handlers::rbac::list_modules))
        .route(
            "/roles/",
            get(handlers::rbac::list_roles).post(handlers::rbac::create_role),
        )
        .route("/roles/{role_id}/privileges", put(handlers::rbac::set_privileges))
        .route("/roles/{role_id}/users/{user_id}", post(handlers::rbac::assign_role));

    let catalog_routes = Router::new()
        .route(
            "/products/",
            get(handlers::catalog::list_products).post(handlers::catalog::create_product),
        )
        .route("/products/search", post(handlers::catalog::search_products))
        .route("/products/export", get(handlers::catalog::export_products))
        .route("/countries/", get(handlers::catalog::list_countries))
        .route("/countries/{id}", delete(handlers::catalog::delete_country))
        .route("/categories/", get(handlers::catalog::list_categories))
        .route("/categories/{id}", delete(handlers::catalog::delete_category));

    let erp_routes = Router::new()
        .route("/erp/sync_erp_vendor", post(handlers::erp::sync_vendors))
        .route("/erp/sync_products", get(handlers::erp::sync_products))
        .route("/erp/sync_ombasic", get(handlers::erp::sync_ombasic))
        .route("/erp/sync_vendor_documents", get(handlers::erp::sync_vendor_documents))
        .route("/erp/sync_branchmast", get(handlers::erp::sync_branchmast));

    let zoho_routes = Router::new().route(
        "/zohoquotes/{quote_id}/comments",
        get(handlers::zoho::list_quote_comments).post(handlers::zoho::add_quote_comment),
    );

    // `route_layer`: o middleware precisa do `MatchedPath` para achar a regra da rota
    let protected = Router::new()
        .merge(auth_routes)
        .merge(register_routes)
        .merge(rbac_routes)
        .merge(catalog_routes)
        .merge(erp_routes)
        .merge(zoho_routes)
        .route("/kyc/{user_id}", get(handlers::kyc::get_kyc_status))
        .route("/files/{id}", get(handlers::files::get_file))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_middleware,
        ));

    // Webhooks se autenticam pelo segredo compartilhado, não por JWT
    let webhook_routes = Router::new().route("/webhooks/zoho/{module}", post(handlers::zoho::zoho_webhook));

    let body_limit = app_state.settings.max_upload_bytes;

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .merge(webhook_routes)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
