// src/db/erp_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::erp::{
        BranchSource, ErpSyncStatus, ItemSource, OmDocumentSource, PartySource, VendorDocumentKind,
        VendorDocumentSource,
    },
};

// Leituras travam as linhas de origem (FOR UPDATE) para que a marcação
// `completed` aconteça na mesma transação que monta o payload.
#[derive(Clone, Default)]
pub struct ErpRepository;

impl ErpRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // partymast
    // ---
    pub async fn party_sources_for_update<'e, E>(&self, executor: E) -> Result<Vec<PartySource>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, PartySource>(
            r#"
            SELECT u.id AS user_id, u.email, u.phone_number, u.firstname, u.lastname, u.usertype,
                   u.erp_external_id,
                   a.line1 AS address_line1, a.line2 AS address_line2,
                   a.city_name, a.state_name, a.country_name, a.pincode,
                   t.pan, t.gstin,
                   b.account_number, b.ifsc_code, b.branch_name, b.account_holder_name,
                   r.assigned_at AS role_assigned_at
            FROM users u
            LEFT JOIN LATERAL (
                SELECT ua.line1, ua.line2, ci.name AS city_name, st.name AS state_name,
                       co.name AS country_name, ua.pincode
                FROM user_addresses ua
                LEFT JOIN cities ci ON ci.id = ua.city_id
                LEFT JOIN states st ON st.id = ua.state_id
                LEFT JOIN countries co ON co.id = ua.country_id
                WHERE ua.user_id = u.id AND ua.is_primary = TRUE
                ORDER BY (lower(ua.address_type) = 'office') DESC, ua.id
                LIMIT 1
            ) a ON TRUE
            LEFT JOIN LATERAL (
                SELECT pan, gstin FROM company_tax_info WHERE company_id = u.id ORDER BY id LIMIT 1
            ) t ON TRUE
            LEFT JOIN LATERAL (
                SELECT account_number, ifsc_code, branch_name, account_holder_name
                FROM company_bank_info
                WHERE company_id = u.id AND is_primary = TRUE
                ORDER BY id LIMIT 1
            ) b ON TRUE
            LEFT JOIN LATERAL (
                SELECT MIN(cts) AS assigned_at FROM user_roles WHERE user_id = u.id
            ) r ON TRUE
            WHERE u.erp_sync_status IS NULL OR u.erp_sync_status = 'pending'
            ORDER BY u.cts, u.id
            FOR UPDATE OF u
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn mark_users_completed<'e, E>(&self, executor: E, ids: &[Uuid], now: DateTime<Utc>) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET erp_sync_status = 'completed', erp_last_sync_at = $2, erp_error_message = NULL
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // ---
    // itemmaster
    // ---
    pub async fn item_sources_for_update<'e, E>(&self, executor: E) -> Result<Vec<ItemSource>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, ItemSource>(
            r#"
            SELECT p.id AS product_id, p.erp_external_id, p.sku, p.name, p.description,
                   c.name AS category_name, s.name AS subcategory_name
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            LEFT JOIN subcategories s ON s.id = p.subcategory_id
            WHERE p.erp_sync_status IS NULL OR p.erp_sync_status = 'pending'
            ORDER BY p.id
            FOR UPDATE OF p
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn mark_products_completed<'e, E>(&self, executor: E, ids: &[i32]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE products SET erp_sync_status = 'completed' WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // ombasic
    // ---
    // Inclui documentos já `completed`: o filtro "usuário já exportado" é feito em memória
    pub async fn om_document_sources_for_update<'e, E>(&self, executor: E) -> Result<Vec<OmDocumentSource>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, OmDocumentSource>(
            r#"
            SELECT d.id AS document_id, d.user_id, u.erp_external_id AS party_id,
                   dv.erp_external_id AS branch_id, d.om_number, d.expiry_date,
                   d.erp_sync_status, d.cts
            FROM user_documents d
            JOIN users u ON u.id = d.user_id
            LEFT JOIN divisions dv ON dv.id = d.division_id
            WHERE u.erp_external_id IS NOT NULL
            ORDER BY d.user_id, d.cts, d.id
            FOR UPDATE OF d
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// Nunca rebaixa uma linha `completed`.
    pub async fn set_user_documents_status<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
        status: ErpSyncStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_documents SET erp_sync_status = $2
            WHERE id = ANY($1) AND erp_sync_status IS DISTINCT FROM 'completed'
            "#,
        )
        .bind(ids)
        .bind(status.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Pacote de documentos do fornecedor
    // ---
    pub async fn vendor_documents_for_update<'e, E>(
        &self,
        executor: E,
        kind: VendorDocumentKind,
    ) -> Result<Vec<VendorDocumentSource>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, owner_join) = vendor_tables(kind);
        let sql = format!(
            r#"
            SELECT '{kind}' AS kind, d.id::text AS document_id, u.erp_external_id AS party_id,
                   d.file_name, d.mime_type, d.document_data
            FROM {table} d
            {owner_join}
            WHERE u.plan_id IS NOT NULL
              AND u.erp_external_id IS NOT NULL
              AND d.is_active = TRUE
              AND (d.erp_sync_status IS NULL OR d.erp_sync_status = 'pending')
            ORDER BY u.erp_external_id, d.cts, d.id
            FOR UPDATE OF d
            "#,
            kind = kind.as_str(),
        );
        let rows = sqlx::query_as::<_, VendorDocumentSource>(&sql)
            .fetch_all(executor)
            .await?;
        Ok(rows)
    }

    pub async fn mark_vendor_documents_completed<'e, E>(
        &self,
        executor: E,
        kind: VendorDocumentKind,
        ids: &[String],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (table, _) = vendor_tables(kind);
        let sql = format!("UPDATE {table} SET erp_sync_status = 'completed' WHERE id::text = ANY($1)");
        let result = sqlx::query(&sql).bind(ids).execute(executor).await?;
        Ok(result.rows_affected())
    }

    // ---
    // branchmast
    // ---
    pub async fn branch_sources_for_update<'e, E>(&self, executor: E) -> Result<Vec<BranchSource>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, BranchSource>(
            r#"
            SELECT dv.id AS division_id, dv.erp_external_id AS division_erp_id,
                   u.erp_external_id AS party_id, dv.name, dv.code, dv.gstin, dv.address,
                   ci.name AS city_name, dv.is_active
            FROM divisions dv
            JOIN users u ON u.id = dv.user_id
            LEFT JOIN cities ci ON ci.id = dv.city_id
            WHERE dv.erp_sync_status IS NULL OR dv.erp_sync_status = 'pending'
            ORDER BY u.erp_external_id, dv.name, dv.id
            FOR UPDATE OF dv
            "#,
        )
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    pub async fn mark_divisions_completed<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE divisions SET erp_sync_status = 'completed' WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

// Tabela e junção até o usuário dono, por tipo de documento (lista fechada)
fn vendor_tables(kind: VendorDocumentKind) -> (&'static str, &'static str) {
    match kind {
        VendorDocumentKind::Bank => (
            "company_bank_documents",
            "JOIN company_bank_info b ON b.id = d.bank_info_id JOIN users u ON u.id = b.company_id",
        ),
        VendorDocumentKind::Tax => (
            "company_tax_documents",
            "JOIN company_tax_info t ON t.id = d.tax_info_id JOIN users u ON u.id = t.company_id",
        ),
        VendorDocumentKind::User => ("user_documents", "JOIN users u ON u.id = d.user_id"),
    }
}
