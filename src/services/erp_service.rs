// src/services/erp_service.rs
//
// Projeção das linhas internas para os payloads do ERP parceiro.
// Cada build trava as linhas de origem, monta o payload com funções puras
// e marca `completed` na mesma transação que devolve o resultado.

use std::{collections::BTreeMap, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::ErpRepository,
    models::erp::{
        BranchMast, BranchMastRecord, BranchSource, ErpSyncStatus, ItemMaster, ItemMasterRecord, ItemSource,
        OmBasic, OmBasicRecord, OmDocumentSource, PartyMast, PartyRecord, PartySource, VendorBundle,
        VendorDocument, VendorDocumentKind, VendorDocumentSource, VendorDocuments,
    },
};

// Valores fixos do cadastro de parceiros
const DEFAULT_PARTY_TYPE: &str = "Vendor";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_CREDIT_DAYS: i32 = 0;
const DEFAULT_UOM: &str = "NOS";
const CREATED_BY: &str = "portal";
const FALLBACK_MIME: &str = "application/octet-stream";

fn status_label(active: bool) -> String {
    if active { "Active" } else { "Inactive" }.to_string()
}

// ---
// 1. Montagem (pura)
// ---
pub fn build_party_records(sources: &[PartySource]) -> Vec<PartyRecord> {
    sources
        .iter()
        .map(|s| PartyRecord {
            partymast: PartyMast {
                partyid: s.erp_external_id.clone(),
                portaluserid: s.user_id,
                partyname: format!("{} {}", s.firstname.trim(), s.lastname.trim()).trim().to_string(),
                partytype: s.usertype.clone().unwrap_or_else(|| DEFAULT_PARTY_TYPE.to_string()),
                email: s.email.clone(),
                mobile: s.phone_number.clone(),
                address1: s.address_line1.clone(),
                address2: s.address_line2.clone(),
                city: s.city_name.clone(),
                state: s.state_name.clone(),
                country: s.country_name.clone(),
                pincode: s.pincode.clone(),
                panno: s.pan.clone(),
                gstin: s.gstin.clone(),
                bankaccno: s.account_number.clone(),
                ifsccode: s.ifsc_code.clone(),
                bankbranch: s.branch_name.clone(),
                accholdername: s.account_holder_name.clone(),
                activefrom: s.role_assigned_at,
                currency: DEFAULT_CURRENCY.to_string(),
                creditdays: DEFAULT_CREDIT_DAYS,
                status: status_label(true),
                createdby: CREATED_BY.to_string(),
            },
        })
        .collect()
}

pub fn build_item_records(sources: &[ItemSource]) -> Vec<ItemMasterRecord> {
    sources
        .iter()
        .map(|s| ItemMasterRecord {
            itemmaster: ItemMaster {
                itemid: s.erp_external_id.clone(),
                itemcode: s.sku.clone(),
                itemname: s.name.clone(),
                description: s.description.clone(),
                category: s.category_name.clone(),
                subcategory: s.subcategory_name.clone(),
                uom: DEFAULT_UOM.to_string(),
                status: status_label(true),
            },
        })
        .collect()
}

#[derive(Debug, Default, PartialEq)]
pub struct OmSelection {
    pub records: Vec<OmBasicRecord>,
    pub completed: Vec<Uuid>,
    pub pending: Vec<Uuid>,
}

/// No máximo um documento válido por usuário, por `cts` e depois `id`.
/// Usuários que já têm documento `completed`, ou sem `erp_external_id`, ficam intocados.
pub fn select_ombasic(documents: &[OmDocumentSource], today: NaiveDate) -> OmSelection {
    let mut by_user: BTreeMap<Uuid, Vec<&OmDocumentSource>> = BTreeMap::new();
    for doc in documents {
        by_user.entry(doc.user_id).or_default().push(doc);
    }

    let mut selection = OmSelection::default();
    for docs in by_user.values_mut() {
        if docs.iter().any(|d| d.is_completed()) {
            continue;
        }
        let Some(party_id) = docs.iter().find_map(|d| d.party_id.clone()) else {
            continue;
        };
        docs.sort_by_key(|d| (d.cts, d.document_id));

        let mut chosen = false;
        for doc in docs.iter() {
            if !doc.is_valid() {
                selection.pending.push(doc.document_id);
                continue;
            }
            if chosen {
                continue;
            }
            if let (Some(omno), Some(expiry)) = (doc.om_number.clone(), doc.expiry_date) {
                selection.records.push(OmBasicRecord {
                    ombasic: OmBasic {
                        partyid: party_id.clone(),
                        branchid: doc.branch_id.clone(),
                        omno: omno.trim().to_string(),
                        efffromdate: today,
                        efftodate: expiry,
                        document_id: doc.document_id,
                    },
                });
                selection.completed.push(doc.document_id);
                chosen = true;
            }
        }
    }
    selection
}

pub fn build_vendor_bundle(folder_name: &str, mut documents: Vec<VendorDocumentSource>) -> VendorBundle {
    documents.sort_by(|a, b| a.party_id.cmp(&b.party_id));

    let mut vendors: Vec<VendorDocuments> = Vec::new();
    for doc in documents {
        let entry = VendorDocument {
            path: format!("{}/{}/{}", folder_name, doc.party_id, doc.file_name),
            source: doc.kind,
            document_id: doc.document_id,
            file_name: doc.file_name,
            mime_type: doc.mime_type.unwrap_or_else(|| FALLBACK_MIME.to_string()),
            content_base64: STANDARD.encode(&doc.document_data),
        };
        match vendors.last_mut() {
            Some(last) if last.partyid == doc.party_id => last.documents.push(entry),
            _ => vendors.push(VendorDocuments { partyid: doc.party_id, documents: vec![entry] }),
        }
    }

    VendorBundle { folder_name: folder_name.to_string(), vendors }
}

pub fn build_branch_records(sources: &[BranchSource]) -> Vec<BranchMastRecord> {
    sources
        .iter()
        .map(|s| BranchMastRecord {
            branchmast: BranchMast {
                branchid: s.division_erp_id.clone().unwrap_or_else(|| s.division_id.to_string()),
                partyid: s.party_id.clone(),
                branchname: s.name.clone(),
                branchcode: s.code.clone(),
                gstin: s.gstin.clone(),
                address: s.address.clone(),
                city: s.city_name.clone(),
                status: status_label(s.is_active),
            },
        })
        .collect()
}

/// Nome de pasta de um só segmento: sem barras, sem `..`.
pub fn validate_folder_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::BadRequest("Invalid folder name".into()));
    }
    Ok(name.to_string())
}

// ---
// 2. Serviço (transacional)
// ---
#[derive(Clone)]
pub struct ErpService {
    pool: PgPool,
    repo: ErpRepository,
    clock: Arc<dyn Clock>,
}

impl ErpService {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, repo: ErpRepository::new(), clock }
    }

    pub async fn build_party_json(&self) -> Result<Vec<PartyRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sources = self.repo.party_sources_for_update(&mut *tx).await?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let records = build_party_records(&sources);
        let ids: Vec<Uuid> = sources.iter().map(|s| s.user_id).collect();
        self.repo.mark_users_completed(&mut *tx, &ids, self.clock.now()).await?;

        tx.commit().await?;
        tracing::info!(count = records.len(), "📤 partymast exportado");
        Ok(records)
    }

    pub async fn build_itemmaster_json(&self) -> Result<Vec<ItemMasterRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sources = self.repo.item_sources_for_update(&mut *tx).await?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let records = build_item_records(&sources);
        let ids: Vec<i32> = sources.iter().map(|s| s.product_id).collect();
        self.repo.mark_products_completed(&mut *tx, &ids).await?;

        tx.commit().await?;
        tracing::info!(count = records.len(), "📤 itemmaster exportado");
        Ok(records)
    }

    pub async fn build_ombasic_json(&self) -> Result<Vec<OmBasicRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let documents = self.repo.om_document_sources_for_update(&mut *tx).await?;
        let selection = select_ombasic(&documents, self.clock.today());

        if !selection.pending.is_empty() {
            self.repo
                .set_user_documents_status(&mut *tx, &selection.pending, ErpSyncStatus::Pending)
                .await?;
        }
        if !selection.completed.is_empty() {
            self.repo
                .set_user_documents_status(&mut *tx, &selection.completed, ErpSyncStatus::Completed)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(
            count = selection.records.len(),
            pending = selection.pending.len(),
            "📤 ombasic exportado"
        );
        Ok(selection.records)
    }

    pub async fn build_vendor_json(&self, folder_name: &str) -> Result<VendorBundle, AppError> {
        let folder_name = validate_folder_name(folder_name)?;
        let mut tx = self.pool.begin().await?;

        let mut documents = Vec::new();
        for kind in [VendorDocumentKind::Bank, VendorDocumentKind::Tax, VendorDocumentKind::User] {
            let rows = self.repo.vendor_documents_for_update(&mut *tx, kind).await?;
            if rows.is_empty() {
                continue;
            }
            let ids: Vec<String> = rows.iter().map(|r| r.document_id.clone()).collect();
            self.repo.mark_vendor_documents_completed(&mut *tx, kind, &ids).await?;
            documents.extend(rows);
        }

        tx.commit().await?;
        let bundle = build_vendor_bundle(&folder_name, documents);
        tracing::info!(vendors = bundle.vendors.len(), "📤 Documentos de fornecedores exportados");
        Ok(bundle)
    }

    pub async fn build_branchmast_json(&self) -> Result<Vec<BranchMastRecord>, AppError> {
        let mut tx = self.pool.begin().await?;

        let sources = self.repo.branch_sources_for_update(&mut *tx).await?;
        if sources.is_empty() {
            return Ok(Vec::new());
        }
        let records = build_branch_records(&sources);
        let ids: Vec<Uuid> = sources.iter().map(|s| s.division_id).collect();
        self.repo.mark_divisions_completed(&mut *tx, &ids).await?;

        tx.commit().await?;
        tracing::info!(count = records.len(), "📤 branchmast exportado");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 9, minute, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    fn om_doc(user: Uuid, id: u128, om: Option<&str>, expiry: Option<NaiveDate>, minute: u32) -> OmDocumentSource {
        OmDocumentSource {
            document_id: Uuid::from_u128(id),
            user_id: user,
            party_id: Some("42".into()),
            branch_id: Some("B1".into()),
            om_number: om.map(str::to_string),
            expiry_date: expiry,
            erp_sync_status: None,
            cts: ts(minute),
        }
    }

    fn expiry() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2030, 1, 1)
    }

    #[test]
    fn ombasic_selects_one_document_per_user_by_creation_order() {
        let user = Uuid::from_u128(1);
        let d1 = om_doc(user, 10, Some("OM1"), expiry(), 1);
        let d2 = om_doc(user, 11, Some("OM2"), expiry(), 2);

        let selection = select_ombasic(&[d2, d1], today());

        assert_eq!(selection.records.len(), 1);
        let om = &selection.records[0].ombasic;
        assert_eq!(om.omno, "OM1");
        assert_eq!(om.partyid, "42");
        assert_eq!(om.branchid.as_deref(), Some("B1"));
        assert_eq!(om.efffromdate, today());
        assert_eq!(om.efftodate, NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
        assert_eq!(selection.completed, vec![Uuid::from_u128(10)]);
        assert!(selection.pending.is_empty());
    }

    #[test]
    fn ombasic_second_run_excludes_user_with_completed_document() {
        let user = Uuid::from_u128(1);
        let mut d1 = om_doc(user, 10, Some("OM1"), expiry(), 1);
        d1.erp_sync_status = Some("completed".into());
        let d2 = om_doc(user, 11, Some("OM2"), expiry(), 2);

        let selection = select_ombasic(&[d1, d2], today());
        assert_eq!(selection, OmSelection::default());
    }

    #[test]
    fn ombasic_marks_invalid_documents_pending() {
        let user = Uuid::from_u128(1);
        let missing_number = om_doc(user, 10, None, expiry(), 1);
        let blank_number = om_doc(user, 11, Some("  "), expiry(), 2);
        let missing_expiry = om_doc(user, 12, Some("OM3"), None, 3);
        let valid = om_doc(user, 13, Some("OM4"), expiry(), 4);

        let selection = select_ombasic(&[missing_number, blank_number, missing_expiry, valid], today());
        assert_eq!(
            selection.pending,
            vec![Uuid::from_u128(10), Uuid::from_u128(11), Uuid::from_u128(12)]
        );
        assert_eq!(selection.completed, vec![Uuid::from_u128(13)]);
    }

    #[test]
    fn ombasic_skips_users_without_party_id() {
        let mut doc = om_doc(Uuid::from_u128(2), 20, Some("OM1"), expiry(), 1);
        doc.party_id = None;
        assert_eq!(select_ombasic(&[doc], today()), OmSelection::default());
    }

    #[test]
    fn vendor_bundle_groups_by_party_with_paths() {
        let doc = |party: &str, id: &str, kind: VendorDocumentKind, file: &str| VendorDocumentSource {
            kind: kind.as_str().to_string(),
            document_id: id.to_string(),
            party_id: party.to_string(),
            file_name: file.to_string(),
            mime_type: None,
            document_data: b"hello".to_vec(),
        };
        let bundle = build_vendor_bundle(
            "batch-01",
            vec![
                doc("P2", "1", VendorDocumentKind::Bank, "cheque.pdf"),
                doc("P1", "5", VendorDocumentKind::Tax, "pan.pdf"),
                doc("P2", "9", VendorDocumentKind::User, "om.pdf"),
            ],
        );

        assert_eq!(bundle.folder_name, "batch-01");
        assert_eq!(bundle.vendors.len(), 2);
        assert_eq!(bundle.vendors[0].partyid, "P1");
        let p2 = &bundle.vendors[1];
        assert_eq!(p2.documents.len(), 2);
        assert_eq!(p2.documents[0].path, "batch-01/P2/cheque.pdf");
        assert_eq!(p2.documents[0].source, "bank");
        assert_eq!(p2.documents[0].mime_type, "application/octet-stream");
        assert_eq!(p2.documents[0].content_base64, "aGVsbG8=");
    }

    #[test]
    fn folder_name_must_be_a_single_segment() {
        assert_eq!(validate_folder_name(" docs ").unwrap(), "docs");
        assert!(validate_folder_name("../etc").is_err());
        assert!(validate_folder_name("a/b").is_err());
        assert!(validate_folder_name("").is_err());
    }

    #[test]
    fn party_record_carries_defaults_and_joined_data() {
        let source = PartySource {
            user_id: Uuid::from_u128(3),
            email: "v@x.io".into(),
            phone_number: Some("999".into()),
            firstname: "Ana".into(),
            lastname: "".into(),
            usertype: None,
            erp_external_id: None,
            address_line1: Some("Rua 1".into()),
            address_line2: None,
            city_name: Some("Pune".into()),
            state_name: None,
            country_name: Some("India".into()),
            pincode: None,
            pan: Some("ABCDE1234F".into()),
            gstin: None,
            account_number: Some("0001".into()),
            ifsc_code: Some("IFSC0001".into()),
            branch_name: None,
            account_holder_name: None,
            role_assigned_at: Some(ts(5)),
        };
        let records = build_party_records(&[source]);
        let party = &records[0].partymast;
        assert_eq!(party.partyname, "Ana");
        assert_eq!(party.partytype, "Vendor");
        assert_eq!(party.currency, "INR");
        assert_eq!(party.panno.as_deref(), Some("ABCDE1234F"));
        assert_eq!(party.activefrom, Some(ts(5)));
        assert_eq!(party.status, "Active");
    }

    #[test]
    fn branch_falls_back_to_division_id() {
        let source = BranchSource {
            division_id: Uuid::from_u128(7),
            division_erp_id: None,
            party_id: Some("42".into()),
            name: "Main".into(),
            code: None,
            gstin: None,
            address: None,
            city_name: None,
            is_active: false,
        };
        let records = build_branch_records(&[source]);
        assert_eq!(records[0].branchmast.branchid, Uuid::from_u128(7).to_string());
        assert_eq!(records[0].branchmast.status, "Inactive");
    }
}
