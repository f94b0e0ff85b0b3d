// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::privilege::RouteAccess,
    models::{
        catalog::{CategoryMaster, Country, CreateProductPayload, Product, ProductSearchPayload},
        rbac::PrivilegeAction,
    },
};

// Rotas cuja ação não segue o método HTTP
inventory::submit! { RouteAccess::action("POST", "/products/search", PrivilegeAction::Search) }
inventory::submit! { RouteAccess::action("GET", "/products/export", PrivilegeAction::Export) }

// ---
// 1. Produtos
// ---
#[utoipa::path(
    get,
    path = "/products/",
    tag = "Catalog",
    responses((status = 200, description = "Produtos", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn list_products(State(app_state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(app_state.catalog_service.list_products().await?))
}

#[utoipa::path(
    post,
    path = "/products/",
    tag = "Catalog",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto criado", body = Product),
        (status = 400, description = "SKU duplicado ou dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let product = app_state.catalog_service.create_product(&payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

// Exige `can_search`, não `can_add`
#[utoipa::path(
    post,
    path = "/products/search",
    tag = "Catalog",
    request_body = ProductSearchPayload,
    responses((status = 200, description = "Produtos filtrados", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn search_products(
    State(app_state): State<AppState>,
    Json(filter): Json<ProductSearchPayload>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(app_state.catalog_service.search_products(&filter).await?))
}

#[utoipa::path(
    get,
    path = "/products/export",
    tag = "Catalog",
    responses((status = 200, description = "Catálogo completo", body = [Product])),
    security(("api_jwt" = []))
)]
pub async fn export_products(State(app_state): State<AppState>) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(app_state.catalog_service.list_products().await?))
}

// ---
// 2. Países
// ---
#[utoipa::path(
    get,
    path = "/countries/",
    tag = "Catalog",
    responses((status = 200, description = "Países", body = [Country])),
    security(("api_jwt" = []))
)]
pub async fn list_countries(State(app_state): State<AppState>) -> Result<Json<Vec<Country>>, ApiError> {
    Ok(Json(app_state.catalog_service.list_countries().await?))
}

#[utoipa::path(
    delete,
    path = "/countries/{id}",
    tag = "Catalog",
    params(("id" = i32, Path, description = "ID do país")),
    responses(
        (status = 204, description = "Removido"),
        (status = 404, description = "País inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_country(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    app_state.catalog_service.delete_country(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---
// 3. Categorias de documento
// ---
#[utoipa::path(
    get,
    path = "/categories/",
    tag = "Catalog",
    responses((status = 200, description = "Mestres de categoria", body = [CategoryMaster])),
    security(("api_jwt" = []))
)]
pub async fn list_categories(State(app_state): State<AppState>) -> Result<Json<Vec<CategoryMaster>>, ApiError> {
    Ok(Json(app_state.catalog_service.list_category_masters().await?))
}

// Recusa enquanto houver detalhes ativos
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "Catalog",
    params(("id" = i32, Path, description = "ID do mestre de categoria")),
    responses(
        (status = 204, description = "Desativado"),
        (status = 400, description = "Ainda possui detalhes ativos"),
        (status = 404, description = "Mestre inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_category(
    State(app_state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    app_state.catalog_service.deactivate_category_master(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
