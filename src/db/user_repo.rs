// src/db/user_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::User};

const USER_COLUMNS: &str = r#"
    id, email, password_hash, phone_number, firstname, lastname, isactive,
    email_confirmed, phone_confirmed, plan_id, usertype, erp_external_id,
    erp_sync_status, erp_last_sync_at, erp_error_message, zoho_erp_id, cts, mts
"#;

// Dados de um novo usuário (já com a senha em hash)
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone_number: &'a str,
    pub firstname: &'a str,
    pub lastname: &'a str,
    pub plan_id: Option<Uuid>,
    pub usertype: Option<&'a str>,
    pub email_confirmed: bool,
    pub phone_confirmed: bool,
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu e-mail (sem diferenciar maiúsculas)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    pub async fn email_or_phone_taken<'e, E>(
        &self,
        executor: E,
        email: &str,
        phone_number: &str,
    ) -> Result<(bool, bool), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (email_taken, phone_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1)),
                EXISTS (SELECT 1 FROM users WHERE phone_number = $2)
            "#,
        )
        .bind(email)
        .bind(phone_number)
        .fetch_one(executor)
        .await?;
        Ok((email_taken, phone_taken))
    }

    // Cria um novo usuário; e-mail/telefone duplicados viram erro de negócio
    pub async fn create_user<'e, E>(&self, executor: E, new_user: &NewUser<'_>) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (
                email, password_hash, phone_number, firstname, lastname,
                plan_id, usertype, email_confirmed, phone_confirmed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.phone_number)
        .bind(new_user.firstname)
        .bind(new_user.lastname)
        .bind(new_user.plan_id)
        .bind(new_user.usertype)
        .bind(new_user.email_confirmed)
        .bind(new_user.phone_confirmed)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        Some("users_phone_number_key") => AppError::PhoneAlreadyExists,
                        _ => AppError::EmailAlreadyExists,
                    };
                }
            }
            e.into()
        })
    }

    pub async fn update_password<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE users SET password_hash = $2, mts = $3 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .bind(now)
            .execute(executor)
            .await?;
        Ok(())
    }
}
