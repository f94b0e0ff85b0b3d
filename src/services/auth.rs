// src/services/auth.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::{clock::Clock, error::AppError},
    db::{SecurityRepository, SessionRepository, UserRepository, session_repo::NewSession},
    models::auth::{TokenKind, TokenResponse, User, UserSecurity},
    services::{
        mailer::Mailer,
        otp_policy::{OtpPolicy, login_locked},
        password::{hash_password, verify_password},
        token::TokenCodec,
    },
};

// Dados do cliente gravados na sessão
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    users: UserRepository,
    security: SecurityRepository,
    sessions: SessionRepository,
    tokens: Arc<TokenCodec>,
    policy: OtpPolicy,
    clock: Arc<dyn Clock>,
    mailer: Arc<dyn Mailer>,
    reset_base_url: String,
}

impl AuthService {
    pub fn new(
        pool: PgPool,
        tokens: Arc<TokenCodec>,
        policy: OtpPolicy,
        clock: Arc<dyn Clock>,
        mailer: Arc<dyn Mailer>,
        reset_base_url: String,
    ) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            security: SecurityRepository::new(),
            sessions: SessionRepository::new(),
            pool,
            tokens,
            policy,
            clock,
            mailer,
            reset_base_url,
        }
    }

    // ---
    // 1. Login (senha)
    // ---
    pub async fn login(&self, email: &str, password: &str, client: &ClientInfo) -> Result<(User, TokenResponse), AppError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        let now = self.clock.now();

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;
        let mut sec = self.locked_security(&mut *tx, user.id).await?;

        self.policy.check_login(&mut sec, now)?;

        if !user.isactive {
            return Err(AppError::Forbidden("Inactive user".into()));
        }

        if !verify_password(password, &user.password_hash).await? {
            let locked = self.policy.record_login_failure(&mut sec, now);
            self.security.save(&mut *tx, &sec).await?;
            tx.commit().await?;

            return match locked {
                Some(until) => {
                    tracing::info!(user_id = %user.id, %until, "🔒 Login bloqueado por tentativas inválidas");
                    Err(login_locked(now, until))
                }
                None => Err(AppError::InvalidCredentials),
            };
        }

        self.policy.record_login_success(&mut sec);
        self.security.save(&mut *tx, &sec).await?;
        let tokens = self.open_session(&mut *tx, user.id, client, now).await?;
        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(user_id = %user.id, "Login efetuado");
        Ok((user, tokens))
    }

    /// Abre uma sessão para um usuário já autenticado por outro fator (OTP).
    pub async fn issue_session(&self, user: &User, client: &ClientInfo) -> Result<TokenResponse, AppError> {
        if !user.isactive {
            return Err(AppError::Forbidden("Inactive user".into()));
        }
        let now = self.clock.now();

        let mut tx = self.pool.begin().await?;
        let mut sec = self.locked_security(&mut *tx, user.id).await?;
        self.policy.record_login_success(&mut sec);
        self.security.save(&mut *tx, &sec).await?;
        let tokens = self.open_session(&mut *tx, user.id, client, now).await?;
        tx.commit().await?;

        Ok(tokens)
    }

    async fn locked_security(&self, conn: &mut PgConnection, user_id: Uuid) -> Result<UserSecurity, AppError> {
        self.security.ensure_row(&mut *conn, user_id).await?;
        self.security
            .lock_for_update(&mut *conn, user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user_security ausente para {}", user_id).into())
    }

    async fn open_session(
        &self,
        conn: &mut PgConnection,
        user_id: Uuid,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse, AppError> {
        let access_token = self.tokens.mint_access(user_id, now)?;
        let refresh_token = self.tokens.mint_refresh(user_id, now)?;

        self.sessions
            .create(
                conn,
                &NewSession {
                    user_id,
                    access_token: &access_token,
                    refresh_token: &refresh_token,
                    created_at: now,
                    expires_at: now + self.tokens.refresh_ttl(),
                    ip_address: client.ip_address.as_deref(),
                    user_agent: client.user_agent.as_deref(),
                },
            )
            .await?;

        Ok(self.token_response(access_token, refresh_token))
    }

    fn token_response(&self, access_token: String, refresh_token: String) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".into(),
            expires_in: self.tokens.access_ttl().num_seconds(),
        }
    }

    // ---
    // 2. Rotação do refresh token
    // ---
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let now = self.clock.now();
        let claims = self
            .tokens
            .verify(refresh_token, TokenKind::Refresh, now)
            .map_err(|_| AppError::Unauthorized("Invalid refresh token".into()))?;

        let mut tx = self.pool.begin().await?;

        let session = self
            .sessions
            .find_for_rotation(&mut *tx, refresh_token, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Session not found".into()))?;

        if session.expires_at < now {
            self.sessions.delete(&mut *tx, session.id).await?;
            tx.commit().await?;
            return Err(AppError::Unauthorized("Session expired".into()));
        }

        let access_token = self.tokens.mint_access(claims.sub, now)?;
        let new_refresh = self.tokens.mint_refresh(claims.sub, now)?;
        self.sessions
            .rotate(&mut *tx, session.id, &access_token, &new_refresh, now + self.tokens.refresh_ttl())
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = %claims.sub, session_id = %session.id, "Sessão rotacionada");
        Ok(self.token_response(access_token, new_refresh))
    }

    // ---
    // 3. Logout
    // ---
    /// Sem refresh token, revoga todas as sessões ativas do usuário.
    pub async fn logout(&self, user_id: Uuid, refresh_token: Option<&str>) -> Result<u64, AppError> {
        let now = self.clock.now();
        let revoked = match refresh_token {
            Some(token) => self.sessions.revoke_one(&self.pool, user_id, token, now).await?,
            None => self.sessions.revoke_all(&self.pool, user_id, now).await?,
        };
        tracing::info!(%user_id, revoked, "Logout");
        Ok(revoked)
    }

    // ---
    // 4. Redefinição de senha
    // ---
    // Sempre responde OK: não revela se o e-mail existe
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            tracing::info!("Pedido de redefinição para e-mail desconhecido");
            return Ok(());
        };

        let token = self.tokens.mint(user.id, TokenKind::Reset, self.clock.now())?;
        let link = reset_link(&self.reset_base_url, &token);
        self.mailer
            .send(
                &user.email,
                "Reset your password",
                &format!("Use the link below to choose a new password:\n{link}"),
            )
            .await?;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let now = self.clock.now();
        let claims = self
            .tokens
            .verify(token, TokenKind::Reset, now)
            .map_err(|_| AppError::BadRequest("Invalid or expired reset token".into()))?;

        let hashed = hash_password(new_password).await?;

        let mut tx = self.pool.begin().await?;
        if self.users.find_by_id(&mut *tx, claims.sub).await?.is_none() {
            return Err(AppError::BadRequest("Invalid or expired reset token".into()));
        }
        self.users.update_password(&mut *tx, claims.sub, &hashed, now).await?;
        let revoked = self.sessions.revoke_all(&mut *tx, claims.sub, now).await?;
        tx.commit().await?;

        tracing::info!(user_id = %claims.sub, revoked, "Senha redefinida");
        Ok(())
    }
}

fn reset_link(base_url: &str, token: &str) -> String {
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}token={token}")
}
