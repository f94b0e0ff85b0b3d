// src/db/session_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::UserSession};

const SESSION_COLUMNS: &str = "id, user_id, access_token, refresh_token, created_at, expires_at, revoked_at, ip_address, user_agent";

pub struct NewSession<'a> {
    pub user_id: Uuid,
    pub access_token: &'a str,
    pub refresh_token: &'a str,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Clone, Default)]
pub struct SessionRepository;

impl SessionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(&self, executor: E, session: &NewSession<'_>) -> Result<UserSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserSession>(&format!(
            r#"
            INSERT INTO user_sessions
                (user_id, access_token, refresh_token, created_at, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.user_id)
        .bind(session.access_token)
        .bind(session.refresh_token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.ip_address)
        .bind(session.user_agent)
        .fetch_one(executor)
        .await?;
        Ok(row)
    }

    /// Sessão não revogada para o par (refresh_token, user_id), travada para rotação.
    /// Um refresh concorrente que perca a corrida reavalia o WHERE e não encontra nada.
    pub async fn find_for_rotation<'e, E>(
        &self,
        executor: E,
        refresh_token: &str,
        user_id: Uuid,
    ) -> Result<Option<UserSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let row = sqlx::query_as::<_, UserSession>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM user_sessions
            WHERE refresh_token = $1 AND user_id = $2 AND revoked_at IS NULL
            FOR UPDATE
            "#
        ))
        .bind(refresh_token)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
        Ok(row)
    }

    pub async fn rotate<'e, E>(
        &self,
        executor: E,
        session_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE user_sessions SET access_token = $2, refresh_token = $3, expires_at = $4 WHERE id = $1",
        )
        .bind(session_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(&self, executor: E, session_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM user_sessions WHERE id = $1")
            .bind(session_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn revoke_one<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE user_sessions SET revoked_at = $3 WHERE user_id = $1 AND refresh_token = $2 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .bind(refresh_token)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn revoke_all<'e, E>(&self, executor: E, user_id: Uuid, now: DateTime<Utc>) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE user_sessions SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL")
            .bind(user_id)
            .bind(now)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
