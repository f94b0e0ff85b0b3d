// src/services/totp.rs

use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::common::error::AppError;

const DIGITS: usize = 6;
const SKEW_STEPS: u8 = 1;

/// Motor TOTP (RFC 6238, SHA1, 6 dígitos, tolerância de ±1 passo).
#[derive(Debug, Clone)]
pub struct TotpEngine {
    step_seconds: u64,
    issuer: String,
}

impl TotpEngine {
    pub fn new(step_seconds: u64, issuer: impl Into<String>) -> Self {
        Self { step_seconds, issuer: issuer.into() }
    }

    pub fn step_seconds(&self) -> u64 {
        self.step_seconds
    }

    /// Novo segredo compartilhado, em base32.
    pub fn generate_secret() -> String {
        Secret::generate_secret().to_encoded().to_string()
    }

    fn build(&self, secret_b32: &str, account: &str) -> Result<TOTP, AppError> {
        let secret_bytes = Secret::Encoded(secret_b32.to_string())
            .to_bytes()
            .map_err(|e| anyhow::anyhow!("segredo TOTP inválido: {e:?}"))?;

        TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW_STEPS,
            self.step_seconds,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| anyhow::anyhow!("TOTP init: {e:?}").into())
    }

    pub fn code_at(&self, secret_b32: &str, now: DateTime<Utc>) -> Result<String, AppError> {
        Ok(self.build(secret_b32, "portal")?.generate(unix_seconds(now)))
    }

    pub fn verify(&self, secret_b32: &str, code: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        Ok(self.build(secret_b32, "portal")?.check(code, unix_seconds(now)))
    }

    /// URI `otpauth://` para apps autenticadores.
    pub fn provisioning_url(&self, secret_b32: &str, account: &str) -> Result<String, AppError> {
        Ok(self.build(secret_b32, account)?.get_url())
    }
}

fn unix_seconds(now: DateTime<Utc>) -> u64 {
    now.timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn engine() -> TotpEngine {
        TotpEngine::new(30, "Portal")
    }

    #[test]
    fn code_verifies_in_same_step() {
        let secret = TotpEngine::generate_secret();
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 5).unwrap();
        let code = engine().code_at(&secret, now).unwrap();
        assert_eq!(code.len(), 6);
        assert!(engine().verify(&secret, &code, now).unwrap());
    }

    #[test]
    fn skew_accepts_one_step_either_side() {
        let secret = TotpEngine::generate_secret();
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 5).unwrap();
        let code = engine().code_at(&secret, now).unwrap();
        assert!(engine().verify(&secret, &code, now + Duration::seconds(30)).unwrap());
        assert!(engine().verify(&secret, &code, now - Duration::seconds(30)).unwrap());
        assert!(!engine().verify(&secret, &code, now + Duration::seconds(120)).unwrap());
    }

    #[test]
    fn provisioning_url_names_issuer_and_account() {
        let secret = TotpEngine::generate_secret();
        let url = engine().provisioning_url(&secret, "u@x.io").unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("Portal"));
    }

    #[test]
    fn malformed_secret_is_an_error() {
        let now = Utc::now();
        assert!(engine().code_at("not base32 !!", now).is_err());
    }
}
