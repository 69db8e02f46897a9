use anyhow::{anyhow, bail, Context, Result};
use common_auth::TokenConfig;
use common_crypto::SymmetricKey;
use std::env;
use std::time::Duration;

use crate::service::DEFAULT_STORE_TIMEOUT;

const DEFAULT_PORT: u16 = 8085;
/// Upper bound for either token lifetime: one year.
const MAX_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub access_key: SymmetricKey,
    pub refresh_key: SymmetricKey,
    pub tokens: TokenConfig,
    pub store_timeout: Duration,
    pub cors_origins: Vec<String>,
}

pub fn load_service_config() -> Result<ServiceConfig> {
    config_from(|key| env::var(key).ok())
}

fn config_from<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let database_url = lookup("DATABASE_URL")
        .and_then(|value| normalize_optional(&value))
        .context("DATABASE_URL must be set")?;

    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = lookup("PORT")
        .map(|value| value.trim().parse::<u16>())
        .transpose()
        .context("Failed to parse PORT")?
        .unwrap_or(DEFAULT_PORT);

    let access_key = key_from(&lookup, "AUTH_ACCESS_TOKEN_KEY")?;
    let refresh_key = key_from(&lookup, "AUTH_REFRESH_TOKEN_KEY")?;
    if access_key == refresh_key {
        bail!("AUTH_ACCESS_TOKEN_KEY and AUTH_REFRESH_TOKEN_KEY must differ");
    }

    let mut tokens = TokenConfig::new();
    if let Some(ttl) = ttl_from(&lookup, "AUTH_ACCESS_TTL_SECONDS")? {
        tokens = tokens.with_access_ttl(ttl);
    }
    if let Some(ttl) = ttl_from(&lookup, "AUTH_REFRESH_TTL_SECONDS")? {
        tokens = tokens.with_refresh_ttl(ttl);
    }

    let store_timeout = positive_from(&lookup, "AUTH_STORE_TIMEOUT_MS")?
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_STORE_TIMEOUT);

    let cors_origins = lookup("AUTH_CORS_ORIGINS")
        .map(|value| parse_origins(&value))
        .unwrap_or_else(default_origins);

    Ok(ServiceConfig {
        database_url,
        host,
        port,
        access_key,
        refresh_key,
        tokens,
        store_timeout,
        cors_origins,
    })
}

fn key_from<F>(lookup: &F, key: &str) -> Result<SymmetricKey>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("{key} must be set to a base64 encoded 32 byte key"))?;
    SymmetricKey::from_base64(&value).with_context(|| format!("Failed to parse {key}"))
}

fn ttl_from<F>(lookup: &F, key: &str) -> Result<Option<chrono::Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = positive_from(lookup, key)? else {
        return Ok(None);
    };
    let seconds = match i64::try_from(value) {
        Ok(seconds) if seconds <= MAX_TTL_SECONDS => seconds,
        _ => bail!("{key} must not exceed {MAX_TTL_SECONDS} seconds"),
    };
    chrono::Duration::try_seconds(seconds)
        .map(Some)
        .ok_or_else(|| anyhow!("{key} is out of range"))
}

fn positive_from<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key).and_then(|value| normalize_optional(&value)) else {
        return Ok(None);
    };
    let value = raw
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}"))?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(Some(value))
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(|c| c == ',' || c == ';' || c == ' ')
        .filter_map(normalize_optional)
        .collect()
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
