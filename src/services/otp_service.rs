// src/services/otp_service.rs

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};

use crate::{
    common::{clock::Clock, error::AppError},
    db::{SecurityRepository, UserRepository},
    models::auth::{TotpSetupResponse, User, UserSecurity},
    services::{
        mailer::Mailer,
        otp_policy::{OtpPolicy, VerifyOutcome},
        totp::TotpEngine,
    },
};

// Envio/verificação de OTP e provisionamento de TOTP.
// Cada operação: trava `user_security`, aplica a política, persiste, commita.
#[derive(Clone)]
pub struct OtpService {
    pool: PgPool,
    users: UserRepository,
    security: SecurityRepository,
    totp: TotpEngine,
    policy: OtpPolicy,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
}

impl OtpService {
    pub fn new(
        pool: PgPool,
        totp: TotpEngine,
        policy: OtpPolicy,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            security: SecurityRepository::new(),
            pool,
            totp,
            policy,
            clock,
            mailer,
        }
    }

    async fn user_by_email(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    async fn locked_security(&self, conn: &mut PgConnection, user: &User) -> Result<UserSecurity, AppError> {
        self.security.ensure_row(&mut *conn, user.id).await?;
        self.security
            .lock_for_update(&mut *conn, user.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user_security ausente para {}", user.id).into())
    }

    // ---
    // 1. Envio
    // ---
    pub async fn send(&self, email: &str) -> Result<(), AppError> {
        let user = self.user_by_email(email).await?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let mut sec = self.locked_security(&mut *tx, &user).await?;

        // A checagem pode armar o bloqueio por cota de reenvio: persiste antes de falhar
        if let Err(e) = self.policy.check_send(&mut sec, now) {
            self.security.save(&mut *tx, &sec).await?;
            tx.commit().await?;
            return Err(e);
        }

        // Sem segredo do usuário, o código sai de um segredo descartável
        let code = match sec.totp_secret.as_deref() {
            Some(secret) => self.totp.code_at(secret, now)?,
            None => self.totp.code_at(&TotpEngine::generate_secret(), now)?,
        };
        self.policy.record_send(&mut sec, code.clone(), now);
        self.security.save(&mut *tx, &sec).await?;
        tx.commit().await?;

        let minutes = self.policy.validity.num_minutes();
        self.mailer
            .send(
                &user.email,
                "Your verification code",
                &format!("Your one-time code is {code}. It expires in {minutes} minute(s)."),
            )
            .await?;

        tracing::info!(user_id = %user.id, resend_count = sec.otp_resend_count, "OTP enviado");
        Ok(())
    }

    // ---
    // 2. Verificação
    // ---
    pub async fn verify(&self, email: &str, submitted: &str) -> Result<User, AppError> {
        let user = self.user_by_email(email).await?;
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let mut sec = self.locked_security(&mut *tx, &user).await?;

        let totp_ok = match sec.totp_secret.as_deref() {
            Some(secret) => Some(self.totp.verify(secret, submitted, now)?),
            None => None,
        };
        let outcome = self.policy.verify(&mut sec, submitted, totp_ok, now);

        // Qualquer desfecho pode ter alterado contadores
        self.security.save(&mut *tx, &sec).await?;
        tx.commit().await?;

        match &outcome {
            VerifyOutcome::LockedNow { until } => {
                tracing::info!(user_id = %user.id, %until, "🔒 OTP bloqueado por tentativas inválidas");
            }
            VerifyOutcome::ResendQuotaExceeded { until } => {
                tracing::info!(user_id = %user.id, %until, "🔒 OTP bloqueado por cota de reenvio");
            }
            VerifyOutcome::Verified => tracing::info!(user_id = %user.id, "OTP verificado"),
            _ => {}
        }

        outcome.into_result(now)?;
        Ok(user)
    }

    // ---
    // 3. TOTP
    // ---
    /// Gera o segredo na primeira chamada; as seguintes devolvem a mesma URI.
    pub async fn setup_totp(&self, email: &str) -> Result<TotpSetupResponse, AppError> {
        let user = self.user_by_email(email).await?;

        let mut tx = self.pool.begin().await?;
        let mut sec = self.locked_security(&mut *tx, &user).await?;

        let secret = match sec.totp_secret.clone() {
            Some(secret) => secret,
            None => {
                let secret = TotpEngine::generate_secret();
                sec.totp_secret = Some(secret.clone());
                self.security.save(&mut *tx, &sec).await?;
                tracing::info!(user_id = %user.id, "Segredo TOTP provisionado");
                secret
            }
        };
        tx.commit().await?;

        Ok(TotpSetupResponse {
            otpauth_url: self.totp.provisioning_url(&secret, &user.email)?,
        })
    }
}
