// src/handlers/auth.rs

use axum::{
    Form, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::RequestContext, privilege::RouteAccess},
    models::auth::{
        LoginResponse, LoginUserPayload, LogoutPayload, MessageResponse, OtpSendPayload, OtpVerifyPayload,
        PasswordResetRequestPayload, RefreshTokenPayload, ResetPasswordPayload, TokenForm, TokenResponse,
        TotpSetupResponse, User,
    },
    services::auth::ClientInfo,
};

// `/users/me` e `/users/logout` valem para qualquer usuário autenticado
inventory::submit! { RouteAccess::authenticated("GET", "/users/me") }
inventory::submit! { RouteAccess::authenticated("POST", "/users/logout") }

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    ClientInfo {
        ip_address: header_str("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        user_agent: header_str(header::USER_AGENT.as_str()).map(str::to_string),
    }
}

// ---
// 1. Login
// ---
// POST /token (formulário OAuth2 "password")
#[utoipa::path(
    post,
    path = "/token",
    tag = "Auth",
    request_body(content = TokenForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Par de tokens", body = TokenResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Conta bloqueada ou inativa")
    )
)]
pub async fn token(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let (_, tokens) = app_state
        .auth_service
        .login(form.username.trim(), &form.password, &client_info(&headers))
        .await?;
    Ok(Json(tokens))
}

// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Usuário, tokens e privilégios", body = LoginResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 403, description = "Conta bloqueada ou inativa")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;

    let (user, tokens) = app_state
        .auth_service
        .login(payload.email.trim(), &payload.password, &client_info(&headers))
        .await?;
    let privileges = app_state.rbac_service.privilege_map(user.id).await?;

    Ok(Json(LoginResponse { user, tokens, privileges }))
}

// POST /auth/refresh
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenPayload,
    responses(
        (status = 200, description = "Tokens rotacionados", body = TokenResponse),
        (status = 401, description = "Sessão inexistente ou expirada")
    )
)]
pub async fn refresh(
    State(app_state): State<AppState>,
    Json(payload): Json<RefreshTokenPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    let tokens = app_state
        .auth_service
        .refresh_access_token(payload.refresh_token.trim())
        .await?;
    Ok(Json(tokens))
}

// ---
// 2. Senha
// ---
#[utoipa::path(
    post,
    path = "/auth/request-password-reset",
    tag = "Auth",
    request_body = PasswordResetRequestPayload,
    responses((status = 200, description = "Sempre OK", body = MessageResponse))
)]
pub async fn request_password_reset(
    State(app_state): State<AppState>,
    Json(payload): Json<PasswordResetRequestPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state.auth_service.request_password_reset(payload.email.trim()).await?;
    Ok(Json(MessageResponse::new(
        "If the email is registered, a reset link has been sent.",
    )))
}

#[utoipa::path(
    post,
    path = "/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Senha alterada", body = MessageResponse),
        (status = 400, description = "Token inválido ou expirado")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state
        .auth_service
        .reset_password(payload.token.trim(), &payload.new_password)
        .await?;
    Ok(Json(MessageResponse::new("Password updated successfully.")))
}

// ---
// 3. OTP / TOTP
// ---
#[utoipa::path(
    post,
    path = "/auth/otp/send",
    tag = "Auth",
    request_body = OtpSendPayload,
    responses(
        (status = 200, description = "OTP enviado", body = MessageResponse),
        (status = 403, description = "OTP ou login bloqueado")
    )
)]
pub async fn send_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<OtpSendPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state.otp_service.send(payload.email.trim()).await?;
    Ok(Json(MessageResponse::new("OTP sent successfully.")))
}

// Verificação bem-sucedida abre uma sessão
#[utoipa::path(
    post,
    path = "/auth/otp/verify",
    tag = "Auth",
    request_body = OtpVerifyPayload,
    responses(
        (status = 200, description = "Par de tokens", body = TokenResponse),
        (status = 400, description = "OTP inválido ou expirado"),
        (status = 403, description = "OTP ou login bloqueado")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<OtpVerifyPayload>,
) -> Result<Json<TokenResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let user = app_state
        .otp_service
        .verify(payload.email.trim(), payload.otp.trim())
        .await?;
    let tokens = app_state
        .auth_service
        .issue_session(&user, &client_info(&headers))
        .await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/totp/setup",
    tag = "Auth",
    request_body = OtpSendPayload,
    responses((status = 200, description = "URI otpauth://", body = TotpSetupResponse))
)]
pub async fn setup_totp(
    State(app_state): State<AppState>,
    Json(payload): Json<OtpSendPayload>,
) -> Result<Json<TotpSetupResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    Ok(Json(app_state.otp_service.setup_totp(payload.email.trim()).await?))
}

// ---
// 4. Usuário autenticado
// ---
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(ctx: RequestContext) -> Json<User> {
    Json(ctx.user)
}

// Sem corpo (ou sem `refresh_token`): encerra todas as sessões
#[utoipa::path(
    post,
    path = "/users/logout",
    tag = "Users",
    request_body(content = LogoutPayload, description = "Refresh token a revogar (opcional)"),
    responses((status = 200, description = "Sessões revogadas", body = MessageResponse)),
    security(("api_jwt" = []))
)]
pub async fn logout(
    State(app_state): State<AppState>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<MessageResponse>, ApiError> {
    let payload: LogoutPayload = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutPayload::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    app_state
        .auth_service
        .logout(ctx.user.id, payload.refresh_token.as_deref().map(str::trim))
        .await?;
    Ok(Json(MessageResponse::new("Logged out successfully.")))
}
