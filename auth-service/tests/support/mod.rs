#![allow(dead_code)]

use std::{env, path::PathBuf, sync::Arc, sync::OnceLock, time::Duration};

use anyhow::{Context, Result};
use auth_service::metrics::AuthMetrics;
use auth_service::service::AuthService;
use auth_service::store::InMemoryPrincipalStore;
use auth_service::{build_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::Utc;
use common_auth::{hash_password, Principal, PrincipalStatus, Role, TokenConfig, TokenMinter, TokenVerifier};
use common_crypto::SymmetricKey;
use dirs::cache_dir;
use http_body_util::BodyExt;
use pg_embed::pg_enums::PgAuthMethod;
use pg_embed::pg_fetch::{PgFetchSettings, PG_V13};
use pg_embed::postgres::{PgEmbed, PgSettings};
use portpicker::pick_unused_port;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

pub const PASSWORD: &str = "CorrectHorseBatteryStaple!";

/// Argon2 is slow in debug builds; hash the shared password once.
pub fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hash password"))
        .clone()
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryPrincipalStore>,
    pub access_key: SymmetricKey,
    pub refresh_key: SymmetricKey,
}

/// Router over an in-memory store seeded with:
/// - `ada` (enabled) holding `reader` and `writer`
/// - `bob` (disabled) holding `reader`
/// - `cyd` (enabled) holding no roles
pub fn in_memory_app() -> TestApp {
    let store = Arc::new(InMemoryPrincipalStore::new());
    store.insert_principal(principal("ada", PrincipalStatus::Enabled));
    store.insert_principal(principal("bob", PrincipalStatus::Disabled));
    store.insert_principal(principal("cyd", PrincipalStatus::Enabled));
    store.insert_role(role(1, "reader", &["inventory:read", "orders:read"]));
    store.insert_role(role(2, "writer", &["orders:read", "orders:write"]));
    store.assign_role("ada", "reader");
    store.assign_role("ada", "writer");
    store.assign_role("bob", "reader");

    let access_key = SymmetricKey::generate();
    let refresh_key = SymmetricKey::generate();
    let minter = TokenMinter::new(TokenConfig::new(), access_key.clone(), refresh_key.clone());
    let verifier = Arc::new(TokenVerifier::new(access_key.clone(), refresh_key.clone()));
    let service = AuthService::new(store.clone(), minter, verifier);
    let metrics = AuthMetrics::new().expect("metrics registry");

    TestApp {
        router: build_router(AppState::new(service, metrics)),
        store,
        access_key,
        refresh_key,
    }
}

pub fn principal(username: &str, status: PrincipalStatus) -> Principal {
    let now = Utc::now();
    Principal {
        id: Uuid::new_v4(),
        username: username.to_string(),
        display_name: format!("{} Test", username.to_uppercase()),
        status,
        created_at: now,
        created_by: "seed".to_string(),
        updated_at: now,
        updated_by: "seed".to_string(),
        password_hash: password_hash(),
    }
}

pub fn role(id: i64, name: &str, permissions: &[&str]) -> Role {
    Role {
        id,
        name: name.to_string(),
        display_name: name.to_uppercase(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn json_request(method: &str, uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

pub fn get_request(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("request")
}

pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn read_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub struct TestDatabase {
    pool: PgPool,
    embedded: Option<EmbeddedPg>,
}

impl TestDatabase {
    pub async fn setup() -> Result<Option<Self>> {
        if env::var("AUTH_TEST_DATABASE_URL").is_err() && !env_flag_enabled("AUTH_TEST_USE_EMBED") {
            eprintln!(
                "Skipping auth-service integration tests: set AUTH_TEST_DATABASE_URL or AUTH_TEST_USE_EMBED=1 to run them.",
            );
            return Ok(None);
        }

        let mut embedded = None;
        let database_url = if let Ok(url) = env::var("AUTH_TEST_DATABASE_URL") {
            url
        } else {
            if env_flag_enabled("AUTH_TEST_EMBED_CLEAR_CACHE") {
                if let Some(cache_dir) = cache_dir() {
                    let _ = std::fs::remove_dir_all(cache_dir.join("pg-embed"));
                }
            }

            let temp = tempdir()?;
            let port = pick_unused_port()
                .context("failed to find available port for embedded Postgres")?;

            let mut fetch_settings = PgFetchSettings::default();
            fetch_settings.version = PG_V13;

            let mut pg = PgEmbed::new(
                PgSettings {
                    database_dir: temp.path().to_path_buf(),
                    port,
                    user: "postgres".to_string(),
                    password: "postgres".to_string(),
                    auth_method: PgAuthMethod::Plain,
                    persistent: false,
                    timeout: Some(Duration::from_secs(30)),
                    migration_dir: None,
                },
                fetch_settings,
            )
            .await?;

            pg.setup().await?;
            pg.start_db().await?;

            let uri = format!("{}/postgres", pg.db_uri);
            embedded = Some(EmbeddedPg {
                pg,
                _temp_dir: temp,
            });
            uri
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        if embedded.is_some() || env_flag_enabled("AUTH_TEST_APPLY_MIGRATIONS") {
            run_migrations(&pool).await?;
        }

        Ok(Some(Self { pool, embedded }))
    }

    pub fn pool_clone(&self) -> PgPool {
        self.pool.clone()
    }

    pub async fn teardown(self) -> Result<()> {
        if let Some(embedded) = self.embedded {
            embedded.shutdown().await;
        }
        Ok(())
    }
}

struct EmbeddedPg {
    pg: PgEmbed,
    _temp_dir: TempDir,
}

impl EmbeddedPg {
    async fn shutdown(mut self) {
        let _ = self.pg.stop_db().await;
    }
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrations_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations");
    let mut entries = std::fs::read_dir(&migrations_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    for path in entries {
        let sql = std::fs::read_to_string(&path)?;
        for statement in sql.split(';') {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed).execute(pool).await?;
        }
    }

    Ok(())
}

/// Inserts a principal whose username is unique per call; returns it.
pub async fn seed_principal(pool: &PgPool, prefix: &str, status: &str) -> Result<String> {
    let username = format!("{prefix}-{}", Uuid::new_v4().simple());
    sqlx::query(
        "INSERT INTO users (id, username, display_name, hash_password, status, created_by, updated_by)
         VALUES ($1, $2, $3, $4, $5, 'seed', 'seed')",
    )
    .bind(Uuid::new_v4())
    .bind(&username)
    .bind(format!("{prefix} display"))
    .bind(password_hash())
    .bind(status)
    .execute(pool)
    .await?;
    Ok(username)
}

/// Inserts a role with the given permissions; returns the role name.
pub async fn seed_role(pool: &PgPool, prefix: &str, permissions: &[&str]) -> Result<String> {
    let name = format!("{prefix}-{}", Uuid::new_v4().simple());
    sqlx::query("INSERT INTO role (name, display_name) VALUES ($1, $2)")
        .bind(&name)
        .bind(prefix)
        .execute(pool)
        .await?;

    for permission in permissions {
        sqlx::query("INSERT INTO permission (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(*permission)
            .execute(pool)
            .await?;
        sqlx::query("INSERT INTO role_has_permission (role_name, permission_name) VALUES ($1, $2)")
            .bind(&name)
            .bind(*permission)
            .execute(pool)
            .await?;
    }

    Ok(name)
}

pub async fn assign_role(pool: &PgPool, username: &str, role_name: &str) -> Result<()> {
    sqlx::query("INSERT INTO user_has_role (username, role_name) VALUES ($1, $2)")
        .bind(username)
        .bind(role_name)
        .execute(pool)
        .await?;
    Ok(())
}

fn env_flag_enabled(key: &str) -> bool {
    matches!(env::var(key), Ok(value) if is_truthy(value.as_str()))
}

fn is_truthy(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}
