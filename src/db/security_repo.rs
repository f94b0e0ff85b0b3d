// src/db/security_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::UserSecurity};

// Linha 1:1 `user_security`. Sem pool próprio: sempre roda na transação do chamador.
#[derive(Clone, Default)]
pub struct SecurityRepository;

impl SecurityRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn ensure_row<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("INSERT INTO user_security (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Lê a linha travando-a até o fim da transação (contenção de linha única).
    pub async fn lock_for_update<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Option<UserSecurity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserSecurity>(
            r#"
            SELECT user_id, totp_secret, otp_code, otp_expiry, otp_attempts, otp_locked_until,
                   last_otp_sent_at, otp_resend_count, failed_login_attempts, login_locked_until,
                   otp_pending_verification
            FROM user_security
            WHERE user_id = $1
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn save<'e, E>(&self, executor: E, sec: &UserSecurity) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE user_security SET
                totp_secret = $2,
                otp_code = $3,
                otp_expiry = $4,
                otp_attempts = $5,
                otp_locked_until = $6,
                last_otp_sent_at = $7,
                otp_resend_count = $8,
                failed_login_attempts = $9,
                login_locked_until = $10,
                otp_pending_verification = $11
            WHERE user_id = $1
            "#,
        )
        .bind(sec.user_id)
        .bind(&sec.totp_secret)
        .bind(&sec.otp_code)
        .bind(sec.otp_expiry)
        .bind(sec.otp_attempts)
        .bind(sec.otp_locked_until)
        .bind(sec.last_otp_sent_at)
        .bind(sec.otp_resend_count)
        .bind(sec.failed_login_attempts)
        .bind(sec.login_locked_until)
        .bind(sec.otp_pending_verification)
        .execute(executor)
        .await?;
        Ok(())
    }
}
