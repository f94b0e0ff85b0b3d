// src/db/catalog_repo.rs

use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::error::AppError,
    models::catalog::{CategoryMaster, Country, CreateProductPayload, Product, ProductSearchPayload},
};

const PRODUCT_COLUMNS: &str = "id, name, sku, description, category_id, subcategory_id, is_active, erp_external_id, erp_sync_status, cts, mts";

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Produtos
    // ---
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn search_products(&self, filter: &ProductSearchPayload) -> Result<Vec<Product>, AppError> {
        let pattern = filter.term.as_deref().map(|t| format!("%{}%", t.trim()));
        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE ($1::text IS NULL OR name ILIKE $1 OR sku ILIKE $1)
              AND ($2::int IS NULL OR category_id = $2)
              AND (NOT $3 OR is_active)
            ORDER BY name ASC
            "#
        ))
        .bind(pattern)
        .bind(filter.category_id)
        .bind(filter.only_active)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn create_product<'e, E>(&self, executor: E, payload: &CreateProductPayload) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (name, sku, description, category_id, subcategory_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(&payload.sku)
        .bind(&payload.description)
        .bind(payload.category_id)
        .bind(payload.subcategory_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique(e, format!("SKU '{}' already exists", payload.sku)))
    }

    // ---
    // Países
    // ---
    pub async fn list_countries(&self) -> Result<Vec<Country>, AppError> {
        let countries = sqlx::query_as::<_, Country>("SELECT id, name, iso_code FROM countries ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(countries)
    }

    pub async fn delete_country(&self, id: i32) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM countries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                    AppError::BadRequest("Country is referenced by states or addresses".into())
                }
                _ => e.into(),
            })?;
        Ok(result.rows_affected())
    }

    // ---
    // Categorias de documentos (mestre/detalhe)
    // ---
    pub async fn list_category_masters(&self) -> Result<Vec<CategoryMaster>, AppError> {
        let masters = sqlx::query_as::<_, CategoryMaster>(
            "SELECT id, name, description, is_active FROM category_master ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(masters)
    }

    pub async fn lock_category_master<'e, E>(&self, executor: E, id: i32) -> Result<Option<CategoryMaster>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let master = sqlx::query_as::<_, CategoryMaster>(
            "SELECT id, name, description, is_active FROM category_master WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(master)
    }

    pub async fn count_active_details<'e, E>(&self, executor: E, master_id: i32) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM category_details WHERE master_id = $1 AND is_active = TRUE",
        )
        .bind(master_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn deactivate_category_master<'e, E>(&self, executor: E, id: i32) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE category_master SET is_active = FALSE WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
