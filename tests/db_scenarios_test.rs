// tests/db_scenarios_test.rs
//
// Fluxos completos contra um Postgres real.
// Rode com `DATABASE_URL=... cargo test -- --ignored`; cada teste usa um schema próprio.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::{Executor, PgPool, postgres::PgPoolOptions};
use tower::ServiceExt;
use uuid::Uuid;

use portal_backend::{
    common::{clock::ManualClock, error::AppError},
    config::{AppState, Settings},
    db::{UserRepository, user_repo::NewUser},
    routes::build_router,
    services::{mailer::LogMailer, password::hash_password},
};

// ---
// 1. Banco isolado por teste
// ---
struct TestDb {
    admin: PgPool,
    pool: PgPool,
    schema: String,
}

impl TestDb {
    async fn new() -> Self {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL deve estar definida");
        let schema = format!("t_{}", Uuid::new_v4().simple());

        let admin = PgPool::connect(&url).await.expect("conexão administrativa");
        admin
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .expect("schema de teste");

        let search_path = schema.clone();
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let sql = format!("SET search_path TO {search_path}");
                Box::pin(async move {
                    conn.execute(sql.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&url)
            .await
            .expect("pool do schema de teste");
        sqlx::migrate!().run(&pool).await.expect("migrações");

        Self { admin, pool, schema }
    }

    fn app(&self) -> (Router, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
        let settings = Settings::new("postgres://ignored", "test-secret");
        let state = AppState::build(
            settings,
            self.pool.clone(),
            Arc::new(clock.clone()),
            Arc::new(LogMailer::new(None)),
        );
        (build_router(state), clock)
    }

    async fn cleanup(self) {
        self.pool.close().await;
        self.admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await
            .expect("remoção do schema");
    }
}

// ---
// 2. Auxiliares de seed e HTTP
// ---
async fn seed_user(pool: &PgPool, email: &str, password: &str) -> Uuid {
    let hash = hash_password(password).await.unwrap();
    sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id")
        .bind(email)
        .bind(hash)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_module(pool: &PgPool, name: &str, path: &str) -> i32 {
    sqlx::query_scalar("INSERT INTO modules (name, path) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(path)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_role(pool: &PgPool, name: &str, user_id: Uuid) -> i32 {
    let role_id: i32 = sqlx::query_scalar("INSERT INTO roles (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await
        .unwrap();
    role_id
}

async fn grant(pool: &PgPool, role_id: i32, module_id: i32, column: &str) {
    sqlx::query(&format!(
        "INSERT INTO role_module_privileges (role_id, module_id, {column}) VALUES ($1, $2, TRUE)"
    ))
    .bind(role_id)
    .bind(module_id)
    .execute(pool)
    .await
    .unwrap();
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn bearer(token: &Value) -> String {
    format!("Bearer {}", token.as_str().unwrap())
}

fn get(uri: &str, token: &Value) -> Request<Body> {
    Request::get(uri)
        .header(header::AUTHORIZATION, bearer(token))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn login(app: &Router, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Request::post("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={email}&password={password}")))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login falhou: {body}");
    body
}

// ---
// 3. Sessões: login, rotação e logout
// ---
#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn refresh_rotation_and_logout_revoke_sessions() {
    let db = TestDb::new().await;
    let (app, _clock) = db.app();
    seed_user(&db.pool, "u@x.io", "Pw0rd!").await;

    let first = login(&app, "u@x.io", "Pw0rd!").await;
    assert_eq!(first["token_type"], "bearer");

    let (status, me) = send(&app, get("/users/me", &first["access_token"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "u@x.io");

    let (status, second) = send(
        &app,
        post_json("/auth/refresh", json!({ "refresh_token": first["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["refresh_token"], first["refresh_token"]);

    // O refresh antigo não serve mais
    let (status, body) = send(
        &app,
        post_json("/auth/refresh", json!({ "refresh_token": first["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session not found");

    // Logout sem corpo revoga todas as sessões
    let (status, _) = send(
        &app,
        Request::post("/users/logout")
            .header(header::AUTHORIZATION, bearer(&second["access_token"]))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        post_json("/auth/refresh", json!({ "refresh_token": second["refresh_token"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session not found");

    db.cleanup().await;
}

// ---
// 4. Privilégios por módulo
// ---
#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn viewer_role_can_list_but_not_add_or_delete() {
    let db = TestDb::new().await;
    let (app, _clock) = db.app();
    let user_id = seed_user(&db.pool, "viewer@x.io", "Pw0rd!").await;
    let products = seed_module(&db.pool, "Products", "products").await;
    seed_module(&db.pool, "Countries", "countries").await;
    let viewer = seed_role(&db.pool, "Viewer", user_id).await;
    grant(&db.pool, viewer, products, "can_view").await;

    let tokens = login(&app, "viewer@x.io", "Pw0rd!").await;
    let access = &tokens["access_token"];

    let (status, body) = send(&app, get("/products/", access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        Request::post("/products/")
            .header(header::AUTHORIZATION, bearer(access))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "name": "Widget", "sku": "W-1" }).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied for 'can_add' on module 'products'");

    let (status, _) = send(
        &app,
        Request::delete("/countries/1")
            .header(header::AUTHORIZATION, bearer(access))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    db.cleanup().await;
}

// ---
// 5. KYC
// ---
async fn seed_company_product(pool: &PgPool, user_id: Uuid, sku: &str, pending_kyc: bool) -> i32 {
    let product_id: i32 = sqlx::query_scalar("INSERT INTO products (name, sku) VALUES ($1, $1) RETURNING id")
        .bind(sku)
        .fetch_one(pool)
        .await
        .unwrap();
    sqlx::query_scalar(
        "INSERT INTO company_products (company_id, product_id, pending_kyc) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(pending_kyc)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn seed_master(pool: &PgPool, name: &str, details: &[&str]) -> Vec<i32> {
    let master_id: i32 = sqlx::query_scalar("INSERT INTO category_master (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
    let mut ids = Vec::new();
    for detail in details {
        let id: i32 = sqlx::query_scalar("INSERT INTO category_details (master_id, name) VALUES ($1, $2) RETURNING id")
            .bind(master_id)
            .bind(detail)
            .fetch_one(pool)
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}

async fn seed_product_document(pool: &PgPool, user_id: Uuid, detail_id: i32, company_product_id: i32) {
    sqlx::query(
        r#"
        INSERT INTO user_documents (user_id, category_detail_id, company_product_id, file_name)
        VALUES ($1, $2, $3, 'doc.pdf')
        "#,
    )
    .bind(user_id)
    .bind(detail_id)
    .bind(company_product_id)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn kyc_report_is_pending_without_bank_documents() {
    let db = TestDb::new().await;
    let (app, _clock) = db.app();
    let user_id = seed_user(&db.pool, "kyc@x.io", "Pw0rd!").await;

    sqlx::query("INSERT INTO user_addresses (user_id, address_type, line1) VALUES ($1, 'office', 'Rua 1')")
        .bind(user_id)
        .execute(&db.pool)
        .await
        .unwrap();
    let tax_id: i32 = sqlx::query_scalar("INSERT INTO company_tax_info (company_id, pan) VALUES ($1, 'ABCDE1234F') RETURNING id")
        .bind(user_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO company_tax_documents (tax_info_id, file_name, pending_kyc) VALUES ($1, 'pan.pdf', TRUE)")
        .bind(tax_id)
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO company_bank_info (company_id, account_number) VALUES ($1, '000123')")
        .bind(user_id)
        .execute(&db.pool)
        .await
        .unwrap();

    let product = seed_company_product(&db.pool, user_id, "W-1", true).await;
    for detail in seed_master(&db.pool, "Company Documents", &["GST Certificate", "Trade License"]).await {
        seed_product_document(&db.pool, user_id, detail, product).await;
    }

    let tokens = login(&app, "kyc@x.io", "Pw0rd!").await;
    let (status, report) = send(&app, get(&format!("/kyc/{user_id}"), &tokens["access_token"])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "KYC Pending");
    assert_eq!(
        report["details"],
        json!({
            "Office Address": true,
            "Product Documents": true,
            "Bank Documents": false,
            "Company Tax Documents": true,
            "Product Mappings": true,
        })
    );

    let all_pending: Option<bool> = sqlx::query_scalar("SELECT bool_and(pending_kyc) FROM user_documents WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(all_pending, Some(true));

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn product_documents_met_when_master_has_no_details() {
    let db = TestDb::new().await;
    let (app, _clock) = db.app();
    let user_id = seed_user(&db.pool, "empty@x.io", "Pw0rd!").await;

    // Mestre exigido sem detalhes; o documento enviado pertence a outro mestre
    seed_master(&db.pool, "Company Documents", &[]).await;
    let other = seed_master(&db.pool, "Other", &["Misc"]).await;
    let product = seed_company_product(&db.pool, user_id, "W-2", false).await;
    seed_product_document(&db.pool, user_id, other[0], product).await;

    let tokens = login(&app, "empty@x.io", "Pw0rd!").await;
    let (status, report) = send(&app, get(&format!("/kyc/{user_id}"), &tokens["access_token"])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["details"]["Product Documents"], true);
    assert_eq!(report["details"]["Office Address"], false);

    db.cleanup().await;
}

// ---
// 6. Exportação ombasic
// ---
#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn ombasic_exports_once_per_vendor() {
    let db = TestDb::new().await;
    let (app, _clock) = db.app();
    let vendor = seed_user(&db.pool, "vendor@x.io", "Pw0rd!").await;
    sqlx::query("UPDATE users SET erp_external_id = '42' WHERE id = $1")
        .bind(vendor)
        .execute(&db.pool)
        .await
        .unwrap();
    for om in ["OM-1", "OM-2"] {
        sqlx::query(
            r#"
            INSERT INTO user_documents (user_id, file_name, om_number, expiry_date)
            VALUES ($1, 'om.pdf', $2, DATE '2030-01-01')
            "#,
        )
        .bind(vendor)
        .bind(om)
        .execute(&db.pool)
        .await
        .unwrap();
    }

    let operator = seed_user(&db.pool, "ops@x.io", "Pw0rd!").await;
    let erp = seed_module(&db.pool, "ERP", "erp").await;
    let role = seed_role(&db.pool, "Integrator", operator).await;
    grant(&db.pool, role, erp, "can_export").await;
    let tokens = login(&app, "ops@x.io", "Pw0rd!").await;

    let (status, first) = send(&app, get("/erp/sync_ombasic", &tokens["access_token"])).await;
    assert_eq!(status, StatusCode::OK);
    let records = first.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ombasic"]["partyid"], "42");
    assert_eq!(records[0]["ombasic"]["efftodate"], "2030-01-01");

    let (status, second) = send(&app, get("/erp/sync_ombasic", &tokens["access_token"])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!([]));

    db.cleanup().await;
}

// ---
// 7. Unicidade de e-mail sem diferenciar maiúsculas
// ---
#[tokio::test]
#[ignore = "requer DATABASE_URL (cargo test -- --ignored)"]
async fn email_is_unique_regardless_of_case() {
    let db = TestDb::new().await;
    let id = seed_user(&db.pool, "Case@X.io", "Pw0rd!").await;
    let users = UserRepository::new(db.pool.clone());

    let found = users.find_by_email("case@x.IO").await.unwrap().unwrap();
    assert_eq!(found.id, id);

    let result = users
        .create_user(
            &db.pool,
            &NewUser {
                email: "case@x.io",
                password_hash: "not-a-real-hash",
                phone_number: "+5511999990000",
                firstname: "Ana",
                lastname: "Lima",
                plan_id: None,
                usertype: None,
                email_confirmed: false,
                phone_confirmed: false,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::EmailAlreadyExists)));

    db.cleanup().await;
}
