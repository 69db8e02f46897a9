use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use auth_service::config::load_service_config;
use auth_service::metrics::AuthMetrics;
use auth_service::service::AuthService;
use auth_service::store::PgPrincipalStore;
use auth_service::{build_router, AppState};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use common_auth::{TokenMinter, TokenVerifier};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_service_config()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(config.store_timeout)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to DATABASE_URL")?;
    let store = Arc::new(PgPrincipalStore::new(pool));

    let minter = TokenMinter::new(
        config.tokens.clone(),
        config.access_key.clone(),
        config.refresh_key.clone(),
    );
    let verifier = Arc::new(TokenVerifier::new(
        config.access_key.clone(),
        config.refresh_key.clone(),
    ));
    let service =
        AuthService::new(store, minter, verifier).with_store_timeout(config.store_timeout);
    let metrics = AuthMetrics::new()?;

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, AUTHORIZATION]);

    let app = build_router(AppState::new(service, metrics)).layer(cors);

    let ip: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((ip, config.port));

    info!(%addr, "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
