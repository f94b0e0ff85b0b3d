// src/services/kyc_service.rs

use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{KycRepository, UserRepository},
    models::kyc::{COMPANY_DOCUMENTS_MASTER, KycReport, KycSection, ProductDocumentCount},
};

/// Algum produto com documentos enviados cobre todos os detalhes ativos do mestre.
/// Mestre ausente nunca satisfaz.
pub fn product_documents_complete(required: Option<i64>, counts: &[ProductDocumentCount]) -> bool {
    match required {
        Some(required) => counts.iter().any(|c| c.satisfying == required),
        None => false,
    }
}

#[derive(Clone)]
pub struct KycService {
    pool: PgPool,
    repo: KycRepository,
    users: UserRepository,
    clock: Arc<dyn Clock>,
}

impl KycService {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo: KycRepository::new(),
            users: UserRepository::new(pool.clone()),
            pool,
            clock,
        }
    }

    // Relatório e marcação `pending_kyc` na mesma transação
    pub async fn evaluate(&self, user_id: Uuid) -> Result<KycReport, AppError> {
        let today = self.clock.today();
        let mut tx = self.pool.begin().await?;

        if self.users.find_by_id(&mut *tx, user_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".into()));
        }

        let office_address = self.repo.has_office_address(&mut *tx, user_id).await?;

        let required = self
            .repo
            .required_document_count(&mut *tx, COMPANY_DOCUMENTS_MASTER)
            .await?;
        let counts = match required {
            Some(_) => {
                self.repo
                    .product_document_counts(&mut *tx, user_id, COMPANY_DOCUMENTS_MASTER, today)
                    .await?
            }
            None => Vec::new(),
        };
        let product_documents = product_documents_complete(required, &counts);
        if product_documents {
            let marked = self.repo.mark_user_documents_pending_kyc(&mut *tx, user_id).await?;
            if marked > 0 {
                tracing::info!(%user_id, marked, "Documentos marcados como pending_kyc");
            }
        }

        let bank_documents = self.repo.has_pending_kyc_bank_document(&mut *tx, user_id).await?;
        let tax_documents = self.repo.has_pending_kyc_tax_document(&mut *tx, user_id).await?;
        let product_mappings = self.repo.has_pending_kyc_product(&mut *tx, user_id).await?;

        tx.commit().await?;

        Ok(KycReport::from_sections(&[
            (KycSection::OfficeAddress, office_address),
            (KycSection::ProductDocuments, product_documents),
            (KycSection::BankDocuments, bank_documents),
            (KycSection::CompanyTaxDocuments, tax_documents),
            (KycSection::ProductMappings, product_mappings),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(company_product_id: i32, satisfying: i64) -> ProductDocumentCount {
        ProductDocumentCount { company_product_id, satisfying }
    }

    #[test]
    fn missing_master_never_satisfies() {
        assert!(!product_documents_complete(None, &[count(1, 3)]));
    }

    #[test]
    fn one_complete_product_is_enough() {
        assert!(product_documents_complete(Some(3), &[count(1, 2), count(2, 3)]));
        assert!(!product_documents_complete(Some(3), &[count(1, 2)]));
    }

    #[test]
    fn zero_required_details_is_trivially_met_by_any_uploaded_product() {
        assert!(product_documents_complete(Some(0), &[count(7, 0)]));
        // Só produtos com algum documento enviado entram na contagem
        assert!(!product_documents_complete(Some(0), &[]));
    }

    #[test]
    fn scenario_report_is_pending_with_expected_sections() {
        let report = KycReport::from_sections(&[
            (KycSection::OfficeAddress, true),
            (KycSection::ProductDocuments, product_documents_complete(Some(2), &[count(1, 2)])),
            (KycSection::BankDocuments, false),
            (KycSection::CompanyTaxDocuments, true),
            (KycSection::ProductMappings, true),
        ]);
        assert_eq!(report.status, "KYC Pending");
        assert_eq!(report.details["Product Documents"], true);
        assert_eq!(report.details["Bank Documents"], false);
    }
}
