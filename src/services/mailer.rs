// src/services/mailer.rs

use async_trait::async_trait;

use crate::common::error::AppError;

// Transporte de e-mail (SMTP fica fora deste serviço)
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Só registra o envio. O corpo pode conter códigos e links, por isso não é logado.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    from: Option<String>,
}

impl LogMailer {
    pub fn new(from: Option<String>) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        tracing::info!(
            to,
            subject,
            from = self.from.as_deref().unwrap_or("-"),
            "📧 E-mail enfileirado"
        );
        Ok(())
    }
}
