// src/models/rbac.rs

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Viewer")]
    pub name: String,
    pub description: Option<String>,
}

// Um módulo = um segmento de URL (`path`) com bits de privilégio por papel
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Module {
    pub id: i32,
    #[schema(example = "Products")]
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "products")]
    pub path: String,
    pub group_name: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow, ToSchema)]
pub struct RoleModulePrivilege {
    #[serde(default)]
    pub role_id: i32,
    pub module_id: i32,
    #[serde(default)]
    pub can_add: bool,
    #[serde(default)]
    pub can_edit: bool,
    #[serde(default)]
    pub can_delete: bool,
    #[serde(default)]
    pub can_search: bool,
    #[serde(default)]
    pub can_import: bool,
    #[serde(default)]
    pub can_export: bool,
    #[serde(default)]
    pub can_view: bool,
}

// Linha usada para montar o mapa de privilégios do login
#[derive(Debug, Clone, FromRow)]
pub struct ModulePrivilegeRow {
    pub module_name: String,
    pub can_add: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub can_search: bool,
    pub can_import: bool,
    pub can_export: bool,
    pub can_view: bool,
}

impl ModulePrivilegeRow {
    pub fn bits(&self) -> [(PrivilegeAction, bool); 7] {
        [
            (PrivilegeAction::View, self.can_view),
            (PrivilegeAction::Add, self.can_add),
            (PrivilegeAction::Edit, self.can_edit),
            (PrivilegeAction::Delete, self.can_delete),
            (PrivilegeAction::Search, self.can_search),
            (PrivilegeAction::Import, self.can_import),
            (PrivilegeAction::Export, self.can_export),
        ]
    }
}

// ---
// Ação de privilégio
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PrivilegeAction {
    #[serde(rename = "can_view")]
    View,
    #[serde(rename = "can_add")]
    Add,
    #[serde(rename = "can_edit")]
    Edit,
    #[serde(rename = "can_delete")]
    Delete,
    #[serde(rename = "can_search")]
    Search,
    #[serde(rename = "can_import")]
    Import,
    #[serde(rename = "can_export")]
    Export,
}

impl PrivilegeAction {
    /// Nome da coluna em `role_module_privileges`. Lista fechada, segura para SQL.
    pub fn column(self) -> &'static str {
        match self {
            PrivilegeAction::View => "can_view",
            PrivilegeAction::Add => "can_add",
            PrivilegeAction::Edit => "can_edit",
            PrivilegeAction::Delete => "can_delete",
            PrivilegeAction::Search => "can_search",
            PrivilegeAction::Import => "can_import",
            PrivilegeAction::Export => "can_export",
        }
    }

    /// GET→can_view, POST→can_add, PUT→can_edit, DELETE→can_delete
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(PrivilegeAction::View),
            Method::POST => Some(PrivilegeAction::Add),
            Method::PUT => Some(PrivilegeAction::Edit),
            Method::DELETE => Some(PrivilegeAction::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for PrivilegeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRolePayload {
    #[validate(length(min = 1, message = "Role name is required."))]
    #[schema(example = "Viewer")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPrivilegesPayload {
    pub privileges: Vec<RoleModulePrivilege>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleAssignment {
    pub user_id: Uuid,
    pub role_id: i32,
}
