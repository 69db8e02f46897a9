use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use common_auth::{AuthContext, AuthError, Principal, Role, TokenPair};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::AppState;
use crate::metrics::{outcome, AuthMetrics};
use crate::service::{LoginRequest, RefreshRequest};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

impl TokenResponse {
    fn from_pair(pair: TokenPair, now: DateTime<Utc>) -> Self {
        Self {
            expires_in: (pair.access_expires_at - now).num_seconds(),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: pair.token_type,
            access_expires_at: pair.access_expires_at,
            refresh_expires_at: pair.refresh_expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PermissionCheckRequest {
    #[serde(default)]
    pub permissions: Vec<String>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(metrics): State<Arc<AuthMetrics>>) -> Response {
    match metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Failed to render metrics");
            AuthError::internal(err).into_response()
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let now = Utc::now();
    let result = state.service.login(&request, now).await;
    state.metrics.login_attempt(outcome(&result));
    Ok(Json(TokenResponse::from_pair(result?, now)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let now = Utc::now();
    let result = state.service.refresh(&request, now).await;
    state.metrics.refresh_attempt(outcome(&result));
    Ok(Json(TokenResponse::from_pair(result?, now)))
}

pub async fn profile(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Principal>, AuthError> {
    let principal = state.service.profile(&auth.claims).await?;
    Ok(Json(principal))
}

pub async fn my_roles(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<Role>>, AuthError> {
    let roles = state.service.list_my_roles(&auth.claims).await?;
    Ok(Json(roles))
}

pub async fn check_permissions(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<PermissionCheckRequest>,
) -> Result<StatusCode, AuthError> {
    let wanted: Vec<&str> = request.permissions.iter().map(String::as_str).collect();
    let result = state.service.require_permissions(&auth.claims, &wanted).await;
    state.metrics.permission_check(outcome(&result));
    result?;
    Ok(StatusCode::NO_CONTENT)
}
