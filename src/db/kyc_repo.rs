// src/db/kyc_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::kyc::ProductDocumentCount};

// Consultas das seções de KYC. Todas rodam na transação do `KycService`.
#[derive(Clone, Default)]
pub struct KycRepository;

impl KycRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn has_office_address<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_addresses WHERE user_id = $1 AND lower(address_type) = 'office')",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    /// Quantidade de detalhes ativos do mestre; `None` se o mestre não existe.
    pub async fn required_document_count<'e, E>(&self, executor: E, master_name: &str) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM category_details d WHERE d.master_id = m.id AND d.is_active = TRUE)
            FROM category_master m
            WHERE m.name = $1
            "#,
        )
        .bind(master_name)
        .fetch_optional(executor)
        .await?;
        Ok(count)
    }

    // Todo produto da empresa com algum documento enviado aparece; a contagem
    // considera só detalhes ativos do mestre informado
    pub async fn product_document_counts<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        master_name: &str,
        today: NaiveDate,
    ) -> Result<Vec<ProductDocumentCount>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ProductDocumentCount>(
            r#"
            SELECT cp.id AS company_product_id,
                   COUNT(DISTINCT ud.category_detail_id) FILTER (
                       WHERE ud.is_active = TRUE
                         AND cd.is_active = TRUE
                         AND cm.name = $2
                         AND (ud.expiry_date IS NULL OR ud.expiry_date >= $3)
                   ) AS satisfying
            FROM company_products cp
            JOIN user_documents ud ON ud.company_product_id = cp.id AND ud.user_id = $1
            LEFT JOIN category_details cd ON cd.id = ud.category_detail_id
            LEFT JOIN category_master cm ON cm.id = cd.master_id
            WHERE cp.company_id = $1
            GROUP BY cp.id
            ORDER BY cp.id
            "#,
        )
        .bind(user_id)
        .bind(master_name)
        .bind(today)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // Idempotente: só toca linhas que ainda não estão marcadas
    pub async fn mark_user_documents_pending_kyc<'e, E>(&self, executor: E, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE user_documents SET pending_kyc = TRUE WHERE user_id = $1 AND pending_kyc = FALSE")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn has_pending_kyc_bank_document<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM company_bank_documents d
                JOIN company_bank_info b ON b.id = d.bank_info_id
                WHERE b.company_id = $1 AND d.pending_kyc = TRUE
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn has_pending_kyc_tax_document<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM company_tax_documents d
                JOIN company_tax_info t ON t.id = d.tax_info_id
                WHERE t.company_id = $1 AND d.pending_kyc = TRUE
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }

    pub async fn has_pending_kyc_product<'e, E>(&self, executor: E, user_id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM company_products WHERE company_id = $1 AND pending_kyc = TRUE)",
        )
        .bind(user_id)
        .fetch_one(executor)
        .await?;
        Ok(exists)
    }
}
