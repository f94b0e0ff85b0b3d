// src/db/rbac_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::rbac::{Module, ModulePrivilegeRow, PrivilegeAction, Role, RoleModulePrivilege},
};

#[derive(Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Módulo pelo segmento de URL
    pub async fn find_module_by_path<'e, E>(&self, executor: E, path: &str) -> Result<Option<Module>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let module = sqlx::query_as::<_, Module>(
            "SELECT id, name, description, path, group_name, is_active FROM modules WHERE path = $1",
        )
        .bind(path)
        .fetch_optional(executor)
        .await?;
        Ok(module)
    }

    pub async fn role_ids_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<i32>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let ids: Vec<i32> = sqlx::query_scalar("SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY role_id")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
        Ok(ids)
    }

    pub async fn has_privilege<'e, E>(
        &self,
        executor: E,
        role_ids: &[i32],
        module_id: i32,
        action: PrivilegeAction,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // `column()` vem de uma lista fechada, por isso o format! é seguro
        let sql = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM role_module_privileges
                WHERE role_id = ANY($1) AND module_id = $2 AND {} = TRUE
            )
            "#,
            action.column()
        );
        let allowed: bool = sqlx::query_scalar(&sql)
            .bind(role_ids)
            .bind(module_id)
            .fetch_one(executor)
            .await?;
        Ok(allowed)
    }

    // Bits por módulo, já agregados (OR) entre os papéis do usuário
    pub async fn privileges_for_user<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Vec<ModulePrivilegeRow>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ModulePrivilegeRow>(
            r#"
            SELECT m.name AS module_name,
                   bool_or(p.can_add)    AS can_add,
                   bool_or(p.can_edit)   AS can_edit,
                   bool_or(p.can_delete) AS can_delete,
                   bool_or(p.can_search) AS can_search,
                   bool_or(p.can_import) AS can_import,
                   bool_or(p.can_export) AS can_export,
                   bool_or(p.can_view)   AS can_view
            FROM user_roles ur
            JOIN role_module_privileges p ON p.role_id = ur.role_id
            JOIN modules m ON m.id = p.module_id
            WHERE ur.user_id = $1 AND m.is_active = TRUE
            GROUP BY m.name
            ORDER BY m.name
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AppError> {
        let roles = sqlx::query_as::<_, Role>("SELECT id, name, description FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT id, name, description, path, group_name, is_active FROM modules ORDER BY group_name, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(modules)
    }

    pub async fn create_role<'e, E>(&self, executor: E, name: &str, description: Option<&str>) -> Result<Role, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING id, name, description",
        )
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("Role '{}' already exists", name)))
    }

    pub async fn role_exists<'e, E>(&self, executor: E, role_id: i32) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(executor)
            .await?;
        Ok(exists)
    }

    pub async fn upsert_privilege<'e, E>(&self, executor: E, p: &RoleModulePrivilege) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO role_module_privileges
                (role_id, module_id, can_add, can_edit, can_delete, can_search, can_import, can_export, can_view)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (role_id, module_id) DO UPDATE SET
                can_add = EXCLUDED.can_add,
                can_edit = EXCLUDED.can_edit,
                can_delete = EXCLUDED.can_delete,
                can_search = EXCLUDED.can_search,
                can_import = EXCLUDED.can_import,
                can_export = EXCLUDED.can_export,
                can_view = EXCLUDED.can_view
            "#,
        )
        .bind(p.role_id)
        .bind(p.module_id)
        .bind(p.can_add)
        .bind(p.can_edit)
        .bind(p.can_delete)
        .bind(p.can_search)
        .bind(p.can_import)
        .bind(p.can_export)
        .bind(p.can_view)
        .execute(executor)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(format!("Module {} not found", p.module_id))
            }
            _ => e.into(),
        })?;
        Ok(())
    }

    pub async fn assign_role<'e, E>(&self, executor: E, user_id: Uuid, role_id: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(role_id)
            .execute(executor)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::NotFound("User or role not found".into())
                }
                _ => e.into(),
            })?;
        Ok(())
    }
}
