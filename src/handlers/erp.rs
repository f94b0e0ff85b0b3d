// src/handlers/erp.rs
//
// Exportações para o ERP. Cada chamada devolve só o que ainda não foi
// exportado e marca as linhas como concluídas na mesma transação.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::privilege::RouteAccess,
    models::{
        erp::{BranchMastRecord, ItemMasterRecord, OmBasicRecord, PartyRecord, VendorBundle},
        rbac::PrivilegeAction,
    },
};

const DEFAULT_VENDOR_FOLDER: &str = "vendor_documents";

inventory::submit! { RouteAccess::action("POST", "/erp/sync_erp_vendor", PrivilegeAction::Export) }
inventory::submit! { RouteAccess::action("GET", "/erp/sync_products", PrivilegeAction::Export) }
inventory::submit! { RouteAccess::action("GET", "/erp/sync_ombasic", PrivilegeAction::Export) }
inventory::submit! { RouteAccess::action("GET", "/erp/sync_vendor_documents", PrivilegeAction::Export) }
inventory::submit! { RouteAccess::action("GET", "/erp/sync_branchmast", PrivilegeAction::Export) }

#[derive(Debug, Deserialize, IntoParams)]
pub struct VendorDocumentsQuery {
    /// Pasta raiz dos caminhos no pacote (padrão `vendor_documents`)
    pub folder_name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/erp/sync_erp_vendor",
    tag = "ERP",
    responses((status = 200, description = "Registros partymast", body = [PartyRecord])),
    security(("api_jwt" = []))
)]
pub async fn sync_vendors(State(app_state): State<AppState>) -> Result<Json<Vec<PartyRecord>>, ApiError> {
    Ok(Json(app_state.erp_service.build_party_json().await?))
}

#[utoipa::path(
    get,
    path = "/erp/sync_products",
    tag = "ERP",
    responses((status = 200, description = "Registros itemmaster", body = [ItemMasterRecord])),
    security(("api_jwt" = []))
)]
pub async fn sync_products(State(app_state): State<AppState>) -> Result<Json<Vec<ItemMasterRecord>>, ApiError> {
    Ok(Json(app_state.erp_service.build_itemmaster_json().await?))
}

#[utoipa::path(
    get,
    path = "/erp/sync_ombasic",
    tag = "ERP",
    responses((status = 200, description = "Um registro ombasic por fornecedor", body = [OmBasicRecord])),
    security(("api_jwt" = []))
)]
pub async fn sync_ombasic(State(app_state): State<AppState>) -> Result<Json<Vec<OmBasicRecord>>, ApiError> {
    Ok(Json(app_state.erp_service.build_ombasic_json().await?))
}

#[utoipa::path(
    get,
    path = "/erp/sync_vendor_documents",
    tag = "ERP",
    params(VendorDocumentsQuery),
    responses(
        (status = 200, description = "Documentos agrupados por fornecedor", body = VendorBundle),
        (status = 400, description = "Nome de pasta inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn sync_vendor_documents(
    State(app_state): State<AppState>,
    Query(query): Query<VendorDocumentsQuery>,
) -> Result<Json<VendorBundle>, ApiError> {
    let folder_name = query.folder_name.as_deref().unwrap_or(DEFAULT_VENDOR_FOLDER);
    Ok(Json(app_state.erp_service.build_vendor_json(folder_name).await?))
}

#[utoipa::path(
    get,
    path = "/erp/sync_branchmast",
    tag = "ERP",
    responses((status = 200, description = "Registros branchmast", body = [BranchMastRecord])),
    security(("api_jwt" = []))
)]
pub async fn sync_branchmast(State(app_state): State<AppState>) -> Result<Json<Vec<BranchMastRecord>>, ApiError> {
    Ok(Json(app_state.erp_service.build_branchmast_json().await?))
}
