// src/models/erp.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// 1. Estado de sincronização (coluna TEXT `erp_sync_status`)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErpSyncStatus {
    Pending,
    Completed,
    Failed,
}

impl ErpSyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ErpSyncStatus::Pending => "pending",
            ErpSyncStatus::Completed => "completed",
            ErpSyncStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw? {
            "pending" => Some(ErpSyncStatus::Pending),
            "completed" => Some(ErpSyncStatus::Completed),
            "failed" => Some(ErpSyncStatus::Failed),
            _ => None,
        }
    }
}

// ---
// 2. Linhas de origem (lidas do banco)
// ---

// Usuário + endereço primário + dados fiscais + banco primário
#[derive(Debug, Clone, FromRow)]
pub struct PartySource {
    pub user_id: Uuid,
    pub email: String,
    pub phone_number: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub usertype: Option<String>,
    pub erp_external_id: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city_name: Option<String>,
    pub state_name: Option<String>,
    pub country_name: Option<String>,
    pub pincode: Option<String>,
    pub pan: Option<String>,
    pub gstin: Option<String>,
    pub account_number: Option<String>,
    pub ifsc_code: Option<String>,
    pub branch_name: Option<String>,
    pub account_holder_name: Option<String>,
    pub role_assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ItemSource {
    pub product_id: i32,
    pub erp_external_id: Option<String>,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category_name: Option<String>,
    pub subcategory_name: Option<String>,
}

// Documento candidato ao `ombasic`
#[derive(Debug, Clone, FromRow)]
pub struct OmDocumentSource {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub party_id: Option<String>,
    pub branch_id: Option<String>,
    pub om_number: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub erp_sync_status: Option<String>,
    pub cts: DateTime<Utc>,
}

impl OmDocumentSource {
    pub fn is_valid(&self) -> bool {
        self.om_number.as_deref().is_some_and(|s| !s.trim().is_empty()) && self.expiry_date.is_some()
    }

    pub fn is_completed(&self) -> bool {
        ErpSyncStatus::parse(self.erp_sync_status.as_deref()) == Some(ErpSyncStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorDocumentKind {
    Bank,
    Tax,
    User,
}

impl VendorDocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VendorDocumentKind::Bank => "bank",
            VendorDocumentKind::Tax => "tax",
            VendorDocumentKind::User => "user",
        }
    }
}

// Documento de banco/fiscal/usuário de um fornecedor com plano
#[derive(Debug, Clone, FromRow)]
pub struct VendorDocumentSource {
    pub kind: String,
    pub document_id: String,
    pub party_id: String,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub document_data: Vec<u8>,
}

#[derive(Debug, Clone, FromRow)]
pub struct BranchSource {
    pub division_id: Uuid,
    pub division_erp_id: Option<String>,
    pub party_id: Option<String>,
    pub name: String,
    pub code: Option<String>,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub city_name: Option<String>,
    pub is_active: bool,
}

// ---
// 3. Payloads no formato do ERP
// ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PartyRecord {
    pub partymast: PartyMast,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PartyMast {
    pub partyid: Option<String>,
    pub portaluserid: Uuid,
    pub partyname: String,
    pub partytype: String,
    pub email: String,
    pub mobile: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub pincode: Option<String>,
    pub panno: Option<String>,
    pub gstin: Option<String>,
    pub bankaccno: Option<String>,
    pub ifsccode: Option<String>,
    pub bankbranch: Option<String>,
    pub accholdername: Option<String>,
    pub activefrom: Option<DateTime<Utc>>,
    pub currency: String,
    pub creditdays: i32,
    pub status: String,
    pub createdby: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ItemMasterRecord {
    pub itemmaster: ItemMaster,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ItemMaster {
    pub itemid: Option<String>,
    pub itemcode: String,
    pub itemname: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub uom: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OmBasicRecord {
    pub ombasic: OmBasic,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OmBasic {
    pub partyid: String,
    pub branchid: Option<String>,
    pub omno: String,
    pub efffromdate: NaiveDate,
    pub efftodate: NaiveDate,
    #[serde(skip)]
    pub document_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VendorBundle {
    pub folder_name: String,
    pub vendors: Vec<VendorDocuments>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VendorDocuments {
    pub partyid: String,
    pub documents: Vec<VendorDocument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct VendorDocument {
    pub source: String,
    pub document_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub path: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BranchMastRecord {
    pub branchmast: BranchMast,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct BranchMast {
    pub branchid: String,
    pub partyid: Option<String>,
    pub branchname: String,
    pub branchcode: Option<String>,
    pub gstin: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub status: String,
}
