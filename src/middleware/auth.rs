// src/middleware/auth.rs

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use sqlx::PgPool;

use crate::{
    common::{clock::Clock, error::AppError},
    config::AppState,
    middleware::privilege::{AccessRule, bypasses_privilege, is_public, module_key, resolve_rule},
    models::auth::{TokenKind, User},
};

// Contexto explícito da requisição autenticada
#[derive(Clone)]
pub struct RequestContext {
    pub user: User,
    pub db: PgPool,
    pub clock: Arc<dyn Clock>,
}

// O middleware em si: autenticação e, depois, privilégio do módulo
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    // 1. Rotas públicas passam direto
    if is_public(&method, &path) {
        return Ok(next.run(request).await);
    }

    // 2. Bearer token (esquema sem diferenciar maiúsculas)
    let token = request
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
        .ok_or(AppError::InvalidToken)?;

    // 3. Verificação
    let claims = app_state
        .tokens
        .verify(&token, TokenKind::Access, app_state.clock.now())?;

    // 4. Usuário
    let user = app_state
        .user_repo
        .find_by_id(&app_state.db_pool, claims.sub)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if !user.isactive {
        return Err(AppError::Unauthorized("Inactive user".into()));
    }
    let user_id = user.id;

    // 5. Insere o contexto nos "extensions" da requisição
    request.extensions_mut().insert(RequestContext {
        user,
        db: app_state.db_pool.clone(),
        clock: app_state.clock.clone(),
    });

    // 6. Desvios de privilégio
    if bypasses_privilege(&path) {
        return Ok(next.run(request).await);
    }

    // 7-9. Módulo, ação, papéis
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    match resolve_rule(&method, &route) {
        Some(AccessRule::Authenticated) => {}
        rule => {
            let action = match rule {
                Some(AccessRule::Action(action)) => Some(action),
                _ => None,
            };
            let key = module_key(&path).unwrap_or_default();
            app_state.rbac_service.authorize(user_id, key, action).await?;
        }
    }

    Ok(next.run(request).await)
}

// Extrator para obter o contexto autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
