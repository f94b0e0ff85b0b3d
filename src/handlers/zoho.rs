// src/handlers/zoho.rs

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::{Value, json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::auth::RequestContext,
    models::zoho::{AddCommentPayload, CommentView},
    services::{
        comment_meta::{comment_view, visible_comments, wrap_comment},
        response_cache::cache_key,
        zoho_client::ZohoClient,
    },
};

// Cotações são "estimates" no SaaS; o webhook invalida por esse nome
const ESTIMATES_MODULE: &str = "estimates";
pub const WEBHOOK_SECRET_HEADER: &str = "x-zoho-webhook-secret";

fn zoho_client(app_state: &AppState) -> Result<&ZohoClient, AppError> {
    app_state
        .zoho_client
        .as_deref()
        .ok_or_else(|| AppError::InternalServerError(anyhow::anyhow!("Zoho integration is not configured")))
}

// Tempo de comparação independe de onde os bytes divergem
fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn comments_key(quote_id: &str) -> String {
    cache_key(ESTIMATES_MODULE, &format!("{quote_id}:comments"))
}

// ---
// 1. Comentários de cotação
// ---
#[utoipa::path(
    get,
    path = "/zohoquotes/{quote_id}/comments",
    tag = "Zoho",
    params(("quote_id" = String, Path, description = "ID da cotação no SaaS")),
    responses(
        (status = 200, description = "Comentários visíveis, sem metadados", body = [CommentView]),
        (status = 400, description = "Erro repassado do SaaS")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_quote_comments(
    State(app_state): State<AppState>,
    Path(quote_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let key = comments_key(&quote_id);
    if let Some(cached) = app_state.response_cache.get(&key).await {
        return Ok(Json(cached));
    }

    let comments = zoho_client(&app_state)?.list_estimate_comments(&quote_id).await?;
    let views = serde_json::to_value(visible_comments(comments))
        .map_err(|e| AppError::InternalServerError(e.into()))?;

    app_state.response_cache.put(key, views.clone()).await;
    Ok(Json(views))
}

#[utoipa::path(
    post,
    path = "/zohoquotes/{quote_id}/comments",
    tag = "Zoho",
    params(("quote_id" = String, Path, description = "ID da cotação no SaaS")),
    request_body = AddCommentPayload,
    responses(
        (status = 201, description = "Comentário criado", body = CommentView),
        (status = 400, description = "Texto vazio ou erro repassado do SaaS")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_quote_comment(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    Path(quote_id): Path<String>,
    Json(payload): Json<AddCommentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let client = zoho_client(&app_state)?;

    let extra = [("quote_id".to_string(), quote_id.clone())];
    let description = wrap_comment(client, &ctx.user.email, &payload.description, &extra).await;
    let comment = client.add_estimate_comment(&quote_id, &description).await?;

    app_state.response_cache.invalidate_module(ESTIMATES_MODULE).await;
    tracing::info!(user_id = %ctx.user.id, quote_id = %quote_id, "Comentário enviado à cotação");

    Ok((StatusCode::CREATED, Json(comment_view(comment))))
}

// ---
// 2. Webhook (fora da autenticação JWT)
// ---
#[utoipa::path(
    post,
    path = "/webhooks/zoho/{module}",
    tag = "Zoho",
    params(("module" = String, Path, description = "Módulo alterado no SaaS (ex.: estimates)")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Cache do módulo invalidado"),
        (status = 401, description = "Segredo ausente ou incorreto")
    )
)]
pub async fn zoho_webhook(
    State(app_state): State<AppState>,
    Path(module): Path<String>,
    headers: HeaderMap,
    _body: Bytes,
) -> Result<Json<Value>, ApiError> {
    // Sem segredo configurado o webhook fica fechado
    let expected = app_state
        .settings
        .zoho_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Webhook secret not configured".into()))?;
    let provided = headers.get(WEBHOOK_SECRET_HEADER).and_then(|v| v.to_str().ok());
    if !secret_matches(provided, expected) {
        tracing::warn!(module = %module, "Webhook rejeitado: segredo inválido");
        return Err(AppError::Unauthorized("Invalid webhook secret".into()).into());
    }

    let removed = app_state.response_cache.invalidate_module(&module).await;
    tracing::info!(module = %module, removed, "Cache invalidado via webhook");
    Ok(Json(json!({ "module": module.to_lowercase(), "invalidated": removed })))
}
