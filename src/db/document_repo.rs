// src/db/document_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::catalog::StoredDocument};

// Leitura dos blobs para `GET /files/{id}`
#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_user_document(&self, id: Uuid) -> Result<Option<StoredDocument>, AppError> {
        let doc = sqlx::query_as::<_, StoredDocument>(
            "SELECT file_name, mime_type, document_data, document_url FROM user_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    pub async fn find_bank_document(&self, id: i32) -> Result<Option<StoredDocument>, AppError> {
        let doc = sqlx::query_as::<_, StoredDocument>(
            "SELECT file_name, mime_type, document_data, document_url FROM company_bank_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    pub async fn find_tax_document(&self, id: i32) -> Result<Option<StoredDocument>, AppError> {
        let doc = sqlx::query_as::<_, StoredDocument>(
            "SELECT file_name, mime_type, document_data, document_url FROM company_tax_documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }
}
