// src/services/rbac_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{RbacRepository, UserRepository},
    models::{
        auth::PrivilegeMap,
        rbac::{Module, ModulePrivilegeRow, PrivilegeAction, Role, RoleAssignment, RoleModulePrivilege},
    },
};

#[derive(Clone)]
pub struct RbacService {
    pool: PgPool,
    repo: RbacRepository,
    users: UserRepository,
}

/// `{module_name → {can_* → bool}}`, já com OR entre os papéis.
pub fn build_privilege_map(rows: &[ModulePrivilegeRow]) -> PrivilegeMap {
    rows.iter()
        .map(|row| {
            let bits = row
                .bits()
                .into_iter()
                .map(|(action, allowed)| (action.column().to_string(), allowed))
                .collect();
            (row.module_name.clone(), bits)
        })
        .collect()
}

impl RbacService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: RbacRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }

    // ---
    // 1. Avaliação (usada pelo middleware)
    // ---
    /// Módulo pelo primeiro segmento da URL, papéis do usuário, bit da ação.
    /// Uma única conexão serve todas as consultas da requisição.
    /// Sem ação resolvida, nega depois de confirmar que o módulo existe.
    pub async fn authorize(
        &self,
        user_id: Uuid,
        module_key: &str,
        action: Option<PrivilegeAction>,
    ) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;

        let module = self
            .repo
            .find_module_by_path(&mut *conn, module_key)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| AppError::ModuleNotRegistered(module_key.to_string()))?;

        let Some(action) = action else {
            tracing::warn!(%user_id, module = module_key, "Acesso negado: nenhuma ação de privilégio para a rota");
            return Err(AppError::Forbidden(format!("Access denied on module '{}'", module_key)));
        };

        let role_ids = self.repo.role_ids_for_user(&mut *conn, user_id).await?;
        if role_ids.is_empty() {
            tracing::warn!(%user_id, module = module_key, "Acesso negado: usuário sem papéis");
            return Err(AppError::Forbidden("User has no roles assigned".into()));
        }

        if !self.repo.has_privilege(&mut *conn, &role_ids, module.id, action).await? {
            tracing::warn!(%user_id, module = module_key, %action, "Acesso negado");
            return Err(AppError::Forbidden(format!(
                "Access denied for '{}' on module '{}'",
                action, module_key
            )));
        }
        Ok(())
    }

    pub async fn privilege_map(&self, user_id: Uuid) -> Result<PrivilegeMap, AppError> {
        let rows = self.repo.privileges_for_user(&self.pool, user_id).await?;
        Ok(build_privilege_map(&rows))
    }

    // ---
    // 2. Administração
    // ---
    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        self.repo.list_roles().await
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        self.repo.list_modules().await
    }

    pub async fn create_role(&self, name: &str, description: Option<&str>) -> Result<Role, AppError> {
        let role = self.repo.create_role(&self.pool, name.trim(), description).await?;
        tracing::info!(role_id = role.id, name = %role.name, "Papel criado");
        Ok(role)
    }

    // Todas as linhas entram juntas ou nenhuma
    pub async fn set_privileges(&self, role_id: i32, privileges: Vec<RoleModulePrivilege>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.repo.role_exists(&mut *tx, role_id).await? {
            return Err(AppError::NotFound(format!("Role {} not found", role_id)));
        }
        for mut privilege in privileges {
            privilege.role_id = role_id;
            self.repo.upsert_privilege(&mut *tx, &privilege).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn assign_role(&self, role_id: i32, user_id: Uuid) -> Result<RoleAssignment, AppError> {
        let mut tx = self.pool.begin().await?;
        if !self.repo.role_exists(&mut *tx, role_id).await? {
            return Err(AppError::NotFound(format!("Role {} not found", role_id)));
        }
        if self.users.find_by_id(&mut *tx, user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }
        self.repo.assign_role(&mut *tx, user_id, role_id).await?;
        tx.commit().await?;

        tracing::info!(%user_id, role_id, "Papel atribuído");
        Ok(RoleAssignment { user_id, role_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(module: &str, view: bool, add: bool) -> ModulePrivilegeRow {
        ModulePrivilegeRow {
            module_name: module.into(),
            can_add: add,
            can_edit: false,
            can_delete: false,
            can_search: false,
            can_import: false,
            can_export: false,
            can_view: view,
        }
    }

    #[test]
    fn privilege_map_lists_every_action_per_module() {
        let map = build_privilege_map(&[row("Products", true, false), row("Countries", true, true)]);

        assert_eq!(map.len(), 2);
        let products = &map["Products"];
        assert_eq!(products.len(), 7);
        assert_eq!(products["can_view"], true);
        assert_eq!(products["can_add"], false);
        assert_eq!(map["Countries"]["can_add"], true);
    }
}
