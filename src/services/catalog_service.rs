// src/services/catalog_service.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::CatalogRepository,
    models::catalog::{CategoryMaster, Country, CreateProductPayload, Product, ProductSearchPayload},
};

#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { repo: CatalogRepository::new(pool.clone()), pool }
    }

    // ---
    // Produtos
    // ---
    pub async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        self.repo.list_products().await
    }

    pub async fn search_products(&self, filter: &ProductSearchPayload) -> Result<Vec<Product>, AppError> {
        self.repo.search_products(filter).await
    }

    pub async fn create_product(&self, payload: &CreateProductPayload) -> Result<Product, AppError> {
        let product = self.repo.create_product(&self.pool, payload).await?;
        tracing::info!(product_id = product.id, sku = %product.sku, "Produto criado");
        Ok(product)
    }

    // ---
    // Países
    // ---
    pub async fn list_countries(&self) -> Result<Vec<Country>, AppError> {
        self.repo.list_countries().await
    }

    pub async fn delete_country(&self, id: i32) -> Result<(), AppError> {
        match self.repo.delete_country(id).await? {
            0 => Err(AppError::NotFound(format!("Country {} not found", id))),
            _ => Ok(()),
        }
    }

    // ---
    // Categorias (mestre)
    // ---
    pub async fn list_category_masters(&self) -> Result<Vec<CategoryMaster>, AppError> {
        self.repo.list_category_masters().await
    }

    /// Desativa o mestre; recusa enquanto houver detalhe ativo apontando para ele.
    pub async fn deactivate_category_master(&self, id: i32) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let master = self
            .repo
            .lock_category_master(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        let active_details = self.repo.count_active_details(&mut *tx, master.id).await?;
        if active_details > 0 {
            return Err(AppError::BadRequest(format!(
                "Category '{}' still has {} active detail(s)",
                master.name, active_details
            )));
        }

        self.repo.deactivate_category_master(&mut *tx, master.id).await?;
        tx.commit().await?;
        tracing::info!(category_id = id, "Categoria desativada");
        Ok(())
    }
}
