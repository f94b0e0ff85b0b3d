// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

// Nosso tipo de erro de domínio. Cada variante corresponde a um status HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    // Violação de unicidade detectada na aplicação (exposta como 400)
    #[error("{0}")]
    Conflict(String),

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Phone number already registered")]
    PhoneAlreadyExists,

    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    // Bloqueios de login/OTP
    #[error("{0}")]
    Locked(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Module '{0}' not registered")]
    ModuleNotRegistered(String),

    // Resposta não-2xx do SaaS de contabilidade
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: StatusCode,
        message: String,
        body: Option<Value>,
    },

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro HTTP: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

// O formato que vai para o fio
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self { status, error: error.into(), details: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::BadRequest(_)
            | AppError::Conflict(_)
            | AppError::EmailAlreadyExists
            | AppError::PhoneAlreadyExists => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) | AppError::Locked(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::ModuleNotRegistered(_) => StatusCode::NOT_FOUND,
            AppError::Upstream { status, .. } if status.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        let status = self.status();
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                ApiError {
                    status,
                    error: "One or more fields are invalid.".into(),
                    details: Some(Value::Object(details)),
                }
            }
            AppError::Upstream { message, body, .. } if status.is_client_error() => ApiError {
                status,
                error: message.clone(),
                details: body.clone(),
            },
            // Todo o resto que vira 500: loga o detalhe, responde genérico.
            e if status.is_server_error() => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(status, "An unexpected error occurred.")
            }
            e => ApiError::new(status, e.to_string()),
        }
    }

    /// Converte uma violação de unicidade do Postgres em `Conflict`.
    pub fn from_unique(e: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict(message.into());
            }
        }
        e.into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error().into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        e.to_api_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_status() {
        assert_eq!(AppError::Conflict("dup".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Locked("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::ModuleNotRegistered("x".into()).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn upstream_client_errors_forward_body() {
        let err = AppError::Upstream {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Invalid estimate".into(),
            body: Some(json!({"code": 1001})),
        };
        let api = err.to_api_error();
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details, Some(json!({"code": 1001})));
    }

    #[test]
    fn upstream_server_errors_are_generic() {
        let err = AppError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: "boom".into(),
            body: None,
        };
        let api = err.to_api_error();
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
    }
}
