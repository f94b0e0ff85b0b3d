// src/services/zoho_client.rs

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    common::error::AppError,
    models::zoho::{ZohoComment, ZohoContact},
    services::zoho_token::UpstreamTokenCache,
};

const REQUEST_TIMEOUT_SECS: u64 = 30;

// Busca de contatos usada pelo codec de metadados dos comentários
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<ZohoContact>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ContactsEnvelope {
    #[serde(default)]
    contacts: Vec<ZohoContact>,
}

#[derive(Debug, Deserialize)]
struct CommentsEnvelope {
    #[serde(default)]
    comments: Vec<ZohoComment>,
}

#[derive(Debug, Deserialize)]
struct CommentEnvelope {
    comment: ZohoComment,
}

#[derive(Clone)]
pub struct ZohoClient {
    http: Client,
    base_url: String,
    organization_id: String,
    tokens: Arc<UpstreamTokenCache>,
}

impl ZohoClient {
    pub fn new(base_url: impl Into<String>, organization_id: impl Into<String>, tokens: Arc<UpstreamTokenCache>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            organization_id: organization_id.into(),
            tokens,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder, AppError> {
        let token = self.tokens.access_token().await?;
        Ok(builder
            .header("Authorization", format!("Zoho-oauthtoken {token}"))
            .query(&[("organization_id", self.organization_id.as_str())]))
    }

    // Não-2xx vira `Upstream` com o corpo JSON repassado
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AppError> {
        let response = self.authorized(builder).await?.send().await?;
        let status = response.status();

        if !status.is_success() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body: Option<Value> = response.json().await.ok();
            let message = body
                .as_ref()
                .and_then(|b| b.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Upstream request failed")
                .to_string();
            return Err(AppError::Upstream {
                status: StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
                message,
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }

    pub async fn list_estimate_comments(&self, estimate_id: &str) -> Result<Vec<ZohoComment>, AppError> {
        let request = self.http.get(self.url(&format!("estimates/{estimate_id}/comments")));
        let envelope: CommentsEnvelope = self.send(request).await?;
        Ok(envelope.comments)
    }

    pub async fn add_estimate_comment(&self, estimate_id: &str, description: &str) -> Result<ZohoComment, AppError> {
        let request = self
            .http
            .post(self.url(&format!("estimates/{estimate_id}/comments")))
            .json(&json!({ "description": description }));
        let envelope: CommentEnvelope = self.send(request).await?;
        Ok(envelope.comment)
    }
}

#[async_trait]
impl ContactDirectory for ZohoClient {
    async fn find_contact_by_email(&self, email: &str) -> Result<Option<ZohoContact>, AppError> {
        let request = self.http.get(self.url("contacts")).query(&[("email", email)]);
        let envelope: ContactsEnvelope = self.send(request).await?;
        Ok(envelope.contacts.into_iter().next())
    }
}
