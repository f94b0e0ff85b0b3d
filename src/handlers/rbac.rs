// src/handlers/rbac.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::privilege::RouteAccess,
    models::{
        auth::MessageResponse,
        rbac::{CreateRolePayload, Module, PrivilegeAction, Role, RoleAssignment, SetPrivilegesPayload},
    },
};

// Atribuir papel altera o papel, não cria um novo
inventory::submit! { RouteAccess::action("POST", "/roles/{role_id}/users/{user_id}", PrivilegeAction::Edit) }

// GET /modules/
#[utoipa::path(
    get,
    path = "/modules/",
    tag = "RBAC",
    responses((status = 200, description = "Módulos cadastrados", body = [Module])),
    security(("api_jwt" = []))
)]
pub async fn list_modules(State(app_state): State<AppState>) -> Result<Json<Vec<Module>>, ApiError> {
    Ok(Json(app_state.rbac_service.list_modules().await?))
}

// GET /roles/
#[utoipa::path(
    get,
    path = "/roles/",
    tag = "RBAC",
    responses((status = 200, description = "Papéis", body = [Role])),
    security(("api_jwt" = []))
)]
pub async fn list_roles(State(app_state): State<AppState>) -> Result<Json<Vec<Role>>, ApiError> {
    Ok(Json(app_state.rbac_service.list_roles().await?))
}

// POST /roles/
#[utoipa::path(
    post,
    path = "/roles/",
    tag = "RBAC",
    request_body = CreateRolePayload,
    responses((status = 201, description = "Papel criado", body = Role)),
    security(("api_jwt" = []))
)]
pub async fn create_role(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateRolePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let role = app_state
        .rbac_service
        .create_role(&payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(role)))
}

// PUT /roles/{role_id}/privileges
#[utoipa::path(
    put,
    path = "/roles/{role_id}/privileges",
    tag = "RBAC",
    params(("role_id" = i32, Path, description = "ID do papel")),
    request_body = SetPrivilegesPayload,
    responses(
        (status = 200, description = "Privilégios gravados", body = MessageResponse),
        (status = 404, description = "Papel inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_privileges(
    State(app_state): State<AppState>,
    Path(role_id): Path<i32>,
    Json(payload): Json<SetPrivilegesPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    app_state.rbac_service.set_privileges(role_id, payload.privileges).await?;
    Ok(Json(MessageResponse::new("Privileges updated successfully.")))
}

// POST /roles/{role_id}/users/{user_id}
#[utoipa::path(
    post,
    path = "/roles/{role_id}/users/{user_id}",
    tag = "RBAC",
    params(
        ("role_id" = i32, Path, description = "ID do papel"),
        ("user_id" = Uuid, Path, description = "ID do usuário")
    ),
    responses(
        (status = 200, description = "Papel atribuído", body = RoleAssignment),
        (status = 404, description = "Papel ou usuário inexistente")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_role(
    State(app_state): State<AppState>,
    Path((role_id, user_id)): Path<(i32, Uuid)>,
) -> Result<Json<RoleAssignment>, ApiError> {
    Ok(Json(app_state.rbac_service.assign_role(role_id, user_id).await?))
}
