// src/handlers/register.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    models::auth::{MessageResponse, RegisterOtpPayload, RegisterUserPayload, RegisterVerifyPayload, User},
};

// POST /register/send-otp
#[utoipa::path(
    post,
    path = "/register/send-otp",
    tag = "Registration",
    request_body = RegisterOtpPayload,
    responses((status = 200, description = "Código enviado", body = MessageResponse))
)]
pub async fn send_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterOtpPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state.registration_service.send_otp(&payload.identifier).await?;
    Ok(Json(MessageResponse::new("OTP sent successfully.")))
}

// POST /register/verify-otp
#[utoipa::path(
    post,
    path = "/register/verify-otp",
    tag = "Registration",
    request_body = RegisterVerifyPayload,
    responses(
        (status = 200, description = "Identificador confirmado", body = MessageResponse),
        (status = 400, description = "Código inválido ou expirado")
    )
)]
pub async fn verify_otp(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterVerifyPayload>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    app_state
        .registration_service
        .verify_otp(&payload.identifier, &payload.otp)
        .await?;
    Ok(Json(MessageResponse::new("OTP verified successfully.")))
}

// POST /register/user
#[utoipa::path(
    post,
    path = "/register/user",
    tag = "Registration",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = User),
        (status = 400, description = "Dados inválidos ou e-mail/telefone já cadastrado")
    )
)]
pub async fn register_user(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let user = app_state.registration_service.register(&payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
