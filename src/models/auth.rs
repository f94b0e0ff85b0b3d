// src/models/auth.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Usuário (tabela `users`)
// ---
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    pub password_hash: String,

    pub phone_number: Option<String>,
    pub firstname: String,
    pub lastname: String,
    pub isactive: bool,
    pub email_confirmed: bool,
    pub phone_confirmed: bool,
    pub plan_id: Option<Uuid>,
    pub usertype: Option<String>,
    pub erp_external_id: Option<String>,
    pub erp_sync_status: Option<String>,
    pub erp_last_sync_at: Option<DateTime<Utc>>,
    pub erp_error_message: Option<String>,
    pub zoho_erp_id: Option<String>,
    pub cts: DateTime<Utc>,
    pub mts: DateTime<Utc>,
}

// ---
// 2. Segurança do usuário (1:1 com `users`)
// ---
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserSecurity {
    pub user_id: Uuid,
    pub totp_secret: Option<String>,
    pub otp_code: Option<String>,
    pub otp_expiry: Option<DateTime<Utc>>,
    pub otp_attempts: i32,
    pub otp_locked_until: Option<DateTime<Utc>>,
    pub last_otp_sent_at: Option<DateTime<Utc>>,
    pub otp_resend_count: i32,
    pub failed_login_attempts: i32,
    pub login_locked_until: Option<DateTime<Utc>>,
    pub otp_pending_verification: bool,
}

impl UserSecurity {
    /// Linha "zerada" para um usuário recém-criado.
    pub fn fresh(user_id: Uuid) -> Self {
        Self {
            user_id,
            totp_secret: None,
            otp_code: None,
            otp_expiry: None,
            otp_attempts: 0,
            otp_locked_until: None,
            last_otp_sent_at: None,
            otp_resend_count: 0,
            failed_login_attempts: 0,
            login_locked_until: None,
            otp_pending_verification: false,
        }
    }
}

// ---
// 3. Sessão (refresh token rotativo)
// ---
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSession {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl UserSession {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

// ---
// 4. JWT
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
    Reset,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: i64,   // Expiration time
    pub iat: i64,   // Issued At
    pub jti: Uuid,  // Torna cada token único, mesmo emitido no mesmo segundo
    pub typ: TokenKind,
}

// ---
// 5. Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

// Formulário OAuth2 "password" do `POST /token`
#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenPayload {
    pub refresh_token: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LogoutPayload {
    // Sem token: encerra todas as sessões do usuário
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordResetRequestPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordPayload {
    pub token: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpSendPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OtpVerifyPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 4, max = 10, message = "Invalid OTP format."))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterOtpPayload {
    #[validate(length(min = 3, message = "Email or phone number is required."))]
    pub identifier: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterVerifyPayload {
    #[validate(length(min = 3, message = "Email or phone number is required."))]
    pub identifier: String,
    #[validate(length(equal = 6, message = "OTP must have 6 digits."))]
    pub otp: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters."))]
    pub password: String,
    #[validate(length(min = 6, message = "Invalid phone number."))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "First name is required."))]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    pub plan_id: Option<Uuid>,
    pub usertype: Option<String>,
}

// ---
// 6. Respostas
// ---
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64, // segundos
}

/// `{module_name → {action → bool}}`
pub type PrivilegeMap = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: TokenResponse,
    #[schema(value_type = Object)]
    pub privileges: PrivilegeMap,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TotpSetupResponse {
    pub otpauth_url: String,
}
