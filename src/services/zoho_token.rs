// src/services/zoho_token.rs

use std::{sync::Arc, time::Duration as StdDuration};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::common::{clock::Clock, error::AppError};

/// Margem antes da expiração em que o token já é tratado como vencido.
const EXPIRY_MARGIN_SECONDS: i64 = 60;
const DEFAULT_EXPIRES_IN: i64 = 3600;

#[derive(Debug, Clone)]
pub struct UpstreamCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
}

// `expires_in` vem do SaaS: valores absurdos caem no padrão em vez de estourar a aritmética
fn expiry_after(now: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    Some(expires_in)
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or_else(|| now + Duration::seconds(DEFAULT_EXPIRES_IN))
}

// Token de acesso do SaaS, memoizado por processo.
// Duas renovações concorrentes são possíveis e inofensivas: vence a última escrita.
pub struct UpstreamTokenCache {
    http: Client,
    credentials: UpstreamCredentials,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<CachedToken>>,
}

impl UpstreamTokenCache {
    pub fn new(credentials: UpstreamCredentials, clock: Arc<dyn Clock>) -> Self {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { http, credentials, clock, cached: RwLock::new(None) }
    }

    pub async fn access_token(&self) -> Result<String, AppError> {
        let now = self.clock.now();
        if let Some(token) = self.cached.read().await.as_ref() {
            if now < token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECONDS) {
                return Ok(token.access_token.clone());
            }
        }

        let (access_token, expires_in) = self.exchange_refresh_token().await?;
        *self.cached.write().await = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: expiry_after(now, expires_in),
        });
        tracing::info!(expires_in, "Token do SaaS renovado");
        Ok(access_token)
    }

    /// Descarta o token memoizado (ex.: após um 401 do SaaS).
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn exchange_refresh_token(&self) -> Result<(String, i64), AppError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        let response = self.http.post(&self.credentials.token_url).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("renovação do token do SaaS falhou ({status}): {body}").into());
        }

        let parsed: RefreshResponse = response.json().await?;
        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok((token, parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN))),
            _ => Err(anyhow::anyhow!(
                "resposta do SaaS sem access_token (erro: {})",
                parsed.error.as_deref().unwrap_or("-")
            )
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn expiry_uses_reported_lifetime() {
        assert_eq!(expiry_after(t0(), 600), t0() + Duration::seconds(600));
    }

    #[test]
    fn out_of_range_lifetime_falls_back_to_default() {
        let fallback = t0() + Duration::seconds(DEFAULT_EXPIRES_IN);
        assert_eq!(expiry_after(t0(), i64::MAX), fallback);
        assert_eq!(expiry_after(t0(), i64::MAX / 1000), fallback);
        assert_eq!(expiry_after(t0(), 0), fallback);
        assert_eq!(expiry_after(t0(), -5), fallback);
    }
}
