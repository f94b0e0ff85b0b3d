// src/models/kyc.rs

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

pub const KYC_COMPLETED: &str = "KYC Completed";
pub const KYC_PENDING: &str = "KYC Pending";

/// Mestre de categoria cujos detalhes definem os documentos de produto exigidos
pub const COMPANY_DOCUMENTS_MASTER: &str = "Company Documents";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KycSection {
    OfficeAddress,
    ProductDocuments,
    BankDocuments,
    CompanyTaxDocuments,
    ProductMappings,
}

impl KycSection {
    pub const ALL: [KycSection; 5] = [
        KycSection::OfficeAddress,
        KycSection::ProductDocuments,
        KycSection::BankDocuments,
        KycSection::CompanyTaxDocuments,
        KycSection::ProductMappings,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KycSection::OfficeAddress => "Office Address",
            KycSection::ProductDocuments => "Product Documents",
            KycSection::BankDocuments => "Bank Documents",
            KycSection::CompanyTaxDocuments => "Company Tax Documents",
            KycSection::ProductMappings => "Product Mappings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct KycReport {
    #[schema(example = "KYC Pending")]
    pub status: String,
    pub details: BTreeMap<String, bool>,
}

impl KycReport {
    pub fn from_sections(sections: &[(KycSection, bool)]) -> Self {
        let details: BTreeMap<String, bool> = sections
            .iter()
            .map(|(section, done)| (section.label().to_string(), *done))
            .collect();
        let complete = KycSection::ALL
            .iter()
            .all(|s| details.get(s.label()).copied().unwrap_or(false));
        Self {
            status: if complete { KYC_COMPLETED } else { KYC_PENDING }.to_string(),
            details,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == KYC_COMPLETED
    }
}

// Contagem de documentos por produto da empresa (seção "Product Documents")
#[derive(Debug, Clone, FromRow)]
pub struct ProductDocumentCount {
    pub company_product_id: i32,
    /// Tipos de documento distintos ativos e dentro da validade
    pub satisfying: i64,
}
