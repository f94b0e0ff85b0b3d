// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub subcategory_id: Option<i32>,
    pub is_active: bool,
    pub erp_external_id: Option<String>,
    pub erp_sync_status: Option<String>,
    pub cts: DateTime<Utc>,
    pub mts: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductPayload {
    #[validate(length(min = 1, message = "Product name is required."))]
    pub name: String,
    #[validate(length(min = 1, message = "SKU is required."))]
    pub sku: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub subcategory_id: Option<i32>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductSearchPayload {
    pub term: Option<String>,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub only_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CompanyProduct {
    pub id: i32,
    pub company_id: Uuid,
    pub product_id: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub stock: i32,
    pub pending_kyc: bool,
    pub cts: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Country {
    pub id: i32,
    pub name: String,
    pub iso_code: Option<String>,
}

// Taxonomia de documentos em dois níveis
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryMaster {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategoryDetail {
    pub id: i32,
    pub master_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
}

// Documento servido por `GET /files/{id}`
#[derive(Debug, Clone, FromRow)]
pub struct StoredDocument {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub document_data: Vec<u8>,
    pub document_url: Option<String>,
}
