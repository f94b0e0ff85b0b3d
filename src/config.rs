// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration as StdDuration};

use anyhow::Context;
use chrono::Duration;
use jsonwebtoken::Algorithm;
use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    common::clock::{Clock, SystemClock},
    db::{DocumentRepository, UserRepository},
    services::{
        auth::AuthService,
        catalog_service::CatalogService,
        erp_service::ErpService,
        file_service::FileService,
        kyc_service::KycService,
        mailer::{LogMailer, Mailer},
        otp_policy::OtpPolicy,
        otp_service::OtpService,
        rbac_service::RbacService,
        registration::RegistrationService,
        response_cache::ResponseCache,
        token::{TokenCodec, parse_symmetric_algorithm},
        totp::TotpEngine,
        zoho_client::ZohoClient,
        zoho_token::{UpstreamCredentials, UpstreamTokenCache},
    },
};

const TOTP_ISSUER: &str = "Vendor Portal";
const RESPONSE_CACHE_MINUTES: i64 = 5;

// ---
// 1. Configuração (variáveis de ambiente)
// ---
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ZohoSettings {
    pub api_base_url: String,
    pub organization_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub token_url: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: String,
    pub jwt_secret: String,
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub totp_interval_secs: u64,
    pub otp_policy: OtpPolicy,
    pub smtp: SmtpSettings,
    pub zoho: Option<ZohoSettings>,
    pub zoho_webhook_secret: Option<String>,
    pub password_reset_base_url: String,
    pub max_upload_bytes: usize,
}

impl Settings {
    /// Valores padrão para tudo que não é obrigatório.
    pub fn new(database_url: impl Into<String>, jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            database_max_connections: 10,
            bind_addr: "0.0.0.0:8000".into(),
            jwt_secret: jwt_secret.into(),
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl: Duration::minutes(30),
            refresh_token_ttl: Duration::days(7),
            totp_interval_secs: 30,
            otp_policy: OtpPolicy::default(),
            smtp: SmtpSettings { host: None, port: 587, user: None, password: None, from: None },
            zoho: None,
            zoho_webhook_secret: None,
            password_reset_base_url: "http://localhost:3000/reset-password".into(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let mut settings = Settings::new(database_url, jwt_secret);

        settings.database_max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10)?;
        settings.bind_addr = env_or("BIND_ADDR", "0.0.0.0:8000".to_string())?;

        let algorithm = env_or("JWT_ALGORITHM", "HS256".to_string())?;
        settings.jwt_algorithm = parse_symmetric_algorithm(&algorithm)
            .with_context(|| format!("JWT_ALGORITHM não suportado: {algorithm}"))?;
        settings.access_token_ttl = Duration::minutes(env_or("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?);
        settings.refresh_token_ttl = Duration::days(env_or("REFRESH_TOKEN_EXPIRE_DAYS", 7)?);

        settings.totp_interval_secs = env_or("TOTP_INTERVAL", 30)?;
        settings.otp_policy = OtpPolicy {
            validity: Duration::minutes(env_or("OTP_VALIDITY_MIN", 5)?),
            max_attempts: env_or("OTP_MAX_ATTEMPTS", 3)?,
            lock_duration: Duration::minutes(env_or("OTP_LOCK_DURATION_MIN", 15)?),
            max_resend: env_or("OTP_MAX_RESEND", 5)?,
            login_max_attempts: env_or("LOGIN_MAX_ATTEMPTS", 5)?,
            login_lock_duration: Duration::minutes(env_or("LOGIN_LOCK_DURATION_MIN", 15)?),
        };

        settings.smtp = SmtpSettings {
            host: optional("SMTP_HOST"),
            port: env_or("SMTP_PORT", 587)?,
            user: optional("SMTP_USER"),
            password: optional("SMTP_PASSWORD"),
            from: optional("SMTP_FROM"),
        };

        // A integração só liga com o conjunto completo de credenciais
        settings.zoho = match (
            optional("ZOHO_ORGANIZATION_ID"),
            optional("ZOHO_CLIENT_ID"),
            optional("ZOHO_CLIENT_SECRET"),
            optional("ZOHO_REFRESH_TOKEN"),
        ) {
            (Some(organization_id), Some(client_id), Some(client_secret), Some(refresh_token)) => Some(ZohoSettings {
                api_base_url: env_or("ZOHO_API_BASE_URL", "https://www.zohoapis.in/books/v3".to_string())?,
                organization_id,
                client_id,
                client_secret,
                refresh_token,
                token_url: env_or("ZOHO_TOKEN_URL", "https://accounts.zoho.in/oauth/v2/token".to_string())?,
            }),
            _ => None,
        };
        settings.zoho_webhook_secret = optional("ZOHO_WEBHOOK_SECRET");

        settings.password_reset_base_url =
            env_or("PASSWORD_RESET_BASE_URL", settings.password_reset_base_url.clone())?;
        let max_upload_mb: usize = env_or("MAX_UPLOAD_SIZE_MB", 10)?;
        settings.max_upload_bytes = max_upload_mb * 1024 * 1024;

        Ok(settings)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("valor inválido para {key}: {e}")),
        None => Ok(default),
    }
}

// ---
// 2. Estado compartilhado
// ---
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub clock: Arc<dyn Clock>,
    pub tokens: Arc<TokenCodec>,
    pub user_repo: UserRepository,
    pub auth_service: AuthService,
    pub otp_service: OtpService,
    pub registration_service: RegistrationService,
    pub rbac_service: RbacService,
    pub kyc_service: KycService,
    pub erp_service: ErpService,
    pub catalog_service: CatalogService,
    pub file_service: FileService,
    pub zoho_client: Option<Arc<ZohoClient>>,
    pub response_cache: Arc<ResponseCache>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let settings = Settings::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(StdDuration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer::new(settings.smtp.from.clone()));
        Ok(Self::build(settings, db_pool, Arc::new(SystemClock), mailer))
    }

    // --- Monta o gráfico de dependências ---
    pub fn build(settings: Settings, db_pool: PgPool, clock: Arc<dyn Clock>, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = Arc::new(TokenCodec::new(
            &settings.jwt_secret,
            settings.jwt_algorithm,
            settings.access_token_ttl,
            settings.refresh_token_ttl,
        ));
        let totp = TotpEngine::new(settings.totp_interval_secs, TOTP_ISSUER);
        let policy = settings.otp_policy.clone();

        let auth_service = AuthService::new(
            db_pool.clone(),
            tokens.clone(),
            policy.clone(),
            clock.clone(),
            mailer.clone(),
            settings.password_reset_base_url.clone(),
        );
        let otp_service = OtpService::new(db_pool.clone(), totp, policy, clock.clone(), mailer.clone());
        let registration_service = RegistrationService::new(db_pool.clone(), clock.clone(), mailer);

        let zoho_client = settings.zoho.as_ref().map(|zoho| {
            let token_cache = Arc::new(UpstreamTokenCache::new(
                UpstreamCredentials {
                    token_url: zoho.token_url.clone(),
                    client_id: zoho.client_id.clone(),
                    client_secret: zoho.client_secret.clone(),
                    refresh_token: zoho.refresh_token.clone(),
                },
                clock.clone(),
            ));
            Arc::new(ZohoClient::new(zoho.api_base_url.clone(), zoho.organization_id.clone(), token_cache))
        });

        Self {
            user_repo: UserRepository::new(db_pool.clone()),
            rbac_service: RbacService::new(db_pool.clone()),
            kyc_service: KycService::new(db_pool.clone(), clock.clone()),
            erp_service: ErpService::new(db_pool.clone(), clock.clone()),
            catalog_service: CatalogService::new(db_pool.clone()),
            file_service: FileService::new(DocumentRepository::new(db_pool.clone())),
            response_cache: Arc::new(ResponseCache::new(Duration::minutes(RESPONSE_CACHE_MINUTES), clock.clone())),
            auth_service,
            otp_service,
            registration_service,
            zoho_client,
            tokens,
            clock,
            db_pool,
            settings: Arc::new(settings),
        }
    }
}
