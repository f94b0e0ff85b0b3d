// src/services/registration.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{SecurityRepository, UserRepository, user_repo::NewUser},
    models::auth::{RegisterUserPayload, User},
    services::{mailer::Mailer, password::hash_password},
};

const REGISTRATION_OTP_SECONDS: i64 = 120;
// Prazo para concluir o cadastro depois de verificar o código
const VERIFIED_MARK_MINUTES: i64 = 30;

#[derive(Debug, Clone)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

// Códigos de cadastro em memória, por e-mail ou telefone.
// Reenviar substitui o código anterior. Entradas vencidas são podadas a cada emissão.
#[derive(Debug, Default)]
pub struct RegistrationOtpStore {
    pending: HashMap<String, PendingCode>,
    /// Identificador -> fim da validade da marca de verificado
    verified: HashMap<String, DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeCheck {
    Verified,
    Missing,
    Expired,
    Mismatch,
}

impl RegistrationOtpStore {
    pub fn issue(&mut self, identifier: String, code: String, now: DateTime<Utc>) {
        self.prune(now);
        self.verified.remove(&identifier);
        self.pending.insert(
            identifier,
            PendingCode { code, expires_at: now + Duration::seconds(REGISTRATION_OTP_SECONDS) },
        );
    }

    pub fn check(&mut self, identifier: &str, submitted: &str, now: DateTime<Utc>) -> CodeCheck {
        let Some(pending) = self.pending.get(identifier) else {
            return CodeCheck::Missing;
        };
        if pending.expires_at < now {
            self.pending.remove(identifier);
            return CodeCheck::Expired;
        }
        if pending.code != submitted {
            return CodeCheck::Mismatch;
        }
        self.pending.remove(identifier);
        self.verified
            .insert(identifier.to_string(), now + Duration::minutes(VERIFIED_MARK_MINUTES));
        CodeCheck::Verified
    }

    pub fn is_verified(&self, identifier: &str, now: DateTime<Utc>) -> bool {
        self.verified.get(identifier).is_some_and(|until| *until >= now)
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        self.pending.retain(|_, p| p.expires_at >= now);
        self.verified.retain(|_, until| *until >= now);
    }

    pub fn forget(&mut self, identifier: &str) {
        self.pending.remove(identifier);
        self.verified.remove(identifier);
    }
}

/// E-mails em minúsculas; telefones só sem espaços nas pontas.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('@') {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

fn six_digit_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

#[derive(Clone)]
pub struct RegistrationService {
    pool: PgPool,
    users: UserRepository,
    security: SecurityRepository,
    store: Arc<Mutex<RegistrationOtpStore>>,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
}

impl RegistrationService {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            security: SecurityRepository::new(),
            pool,
            store: Arc::new(Mutex::new(RegistrationOtpStore::default())),
            clock,
            mailer,
        }
    }

    pub async fn send_otp(&self, identifier: &str) -> Result<(), AppError> {
        let identifier = normalize_identifier(identifier);
        let code = six_digit_code();

        self.store
            .lock()
            .await
            .issue(identifier.clone(), code.clone(), self.clock.now());

        self.mailer
            .send(
                &identifier,
                "Your registration code",
                &format!("Your registration code is {code}. It expires in 2 minutes."),
            )
            .await
    }

    pub async fn verify_otp(&self, identifier: &str, otp: &str) -> Result<(), AppError> {
        let identifier = normalize_identifier(identifier);
        let outcome = self.store.lock().await.check(&identifier, otp.trim(), self.clock.now());

        match outcome {
            CodeCheck::Verified => Ok(()),
            CodeCheck::Missing => Err(AppError::BadRequest("No OTP was requested for this identifier".into())),
            CodeCheck::Expired => Err(AppError::BadRequest("OTP expired".into())),
            CodeCheck::Mismatch => Err(AppError::BadRequest("Invalid OTP".into())),
        }
    }

    // Usuário + linha de segurança na mesma transação
    pub async fn register(&self, payload: &RegisterUserPayload) -> Result<User, AppError> {
        let email = normalize_identifier(&payload.email);
        let phone = normalize_identifier(&payload.phone_number);

        let (email_confirmed, phone_confirmed) = {
            let now = self.clock.now();
            let store = self.store.lock().await;
            (store.is_verified(&email, now), store.is_verified(&phone, now))
        };

        let hashed = hash_password(&payload.password).await?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let (email_taken, phone_taken) = self.users.email_or_phone_taken(&mut *tx, &email, &phone).await?;
        if email_taken {
            return Err(AppError::EmailAlreadyExists);
        }
        if phone_taken {
            return Err(AppError::PhoneAlreadyExists);
        }

        let user = self
            .users
            .create_user(
                &mut *tx,
                &NewUser {
                    email: &email,
                    password_hash: &hashed,
                    phone_number: &phone,
                    firstname: payload.firstname.trim(),
                    lastname: payload.lastname.trim(),
                    plan_id: payload.plan_id,
                    usertype: payload.usertype.as_deref(),
                    email_confirmed,
                    phone_confirmed,
                },
            )
            .await?;
        self.security.ensure_row(&mut *tx, user.id).await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        {
            let mut store = self.store.lock().await;
            store.forget(&email);
            store.forget(&phone);
        }

        tracing::info!(user_id = %user.id, "Usuário cadastrado");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn code_verifies_once_within_window() {
        let mut store = RegistrationOtpStore::default();
        store.issue("a@b.c".into(), "123456".into(), t0());

        assert_eq!(store.check("a@b.c", "000000", t0()), CodeCheck::Mismatch);
        assert_eq!(store.check("a@b.c", "123456", t0() + Duration::seconds(119)), CodeCheck::Verified);
        assert!(store.is_verified("a@b.c", t0()));
        // O código é descartado após o uso
        assert_eq!(store.check("a@b.c", "123456", t0()), CodeCheck::Missing);
    }

    #[test]
    fn code_expires_after_two_minutes() {
        let mut store = RegistrationOtpStore::default();
        store.issue("+5511999990000".into(), "654321".into(), t0());
        assert_eq!(
            store.check("+5511999990000", "654321", t0() + Duration::seconds(121)),
            CodeCheck::Expired
        );
        assert!(!store.is_verified("+5511999990000", t0()));
    }

    #[test]
    fn resend_replaces_previous_code() {
        let mut store = RegistrationOtpStore::default();
        store.issue("a@b.c".into(), "111111".into(), t0());
        store.issue("a@b.c".into(), "222222".into(), t0());
        assert_eq!(store.check("a@b.c", "111111", t0()), CodeCheck::Mismatch);
        assert_eq!(store.check("a@b.c", "222222", t0()), CodeCheck::Verified);
    }

    #[test]
    fn issuing_prunes_expired_codes() {
        let mut store = RegistrationOtpStore::default();
        store.issue("old@b.c".into(), "111111".into(), t0());
        store.issue("new@b.c".into(), "222222".into(), t0() + Duration::seconds(121));

        assert!(!store.pending.contains_key("old@b.c"));
        assert!(store.pending.contains_key("new@b.c"));
    }

    #[test]
    fn verified_mark_expires_and_is_pruned() {
        let mut store = RegistrationOtpStore::default();
        store.issue("a@b.c".into(), "123456".into(), t0());
        assert_eq!(store.check("a@b.c", "123456", t0()), CodeCheck::Verified);

        let later = t0() + Duration::minutes(VERIFIED_MARK_MINUTES) + Duration::seconds(1);
        assert!(store.is_verified("a@b.c", t0() + Duration::minutes(VERIFIED_MARK_MINUTES)));
        assert!(!store.is_verified("a@b.c", later));

        store.issue("x@y.z".into(), "999999".into(), later);
        assert!(store.verified.is_empty());
    }

    #[test]
    fn identifiers_are_normalized() {
        assert_eq!(normalize_identifier("  A@B.Io "), "a@b.io");
        assert_eq!(normalize_identifier(" +55 11 "), "+55 11");
        assert_eq!(six_digit_code().len(), 6);
    }
}
