// src/models/zoho.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// Contato do SaaS de contabilidade
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ZohoContact {
    pub contact_id: String,
    pub contact_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

// Comentário como o SaaS devolve
#[derive(Debug, Clone, Deserialize)]
pub struct ZohoComment {
    pub comment_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commented_by: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

// Comentário como o portal devolve
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommentView {
    pub comment_id: String,
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub commented_by: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCommentPayload {
    #[validate(length(min = 1, message = "Comment text is required."))]
    pub description: String,
}
