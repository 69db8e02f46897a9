use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::{get, post};
use axum::Router;
use common_auth::TokenVerifier;

use crate::handlers::{check_permissions, health, login, metrics, my_roles, profile, refresh};
use crate::metrics::AuthMetrics;
use crate::service::AuthService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AuthService>,
    pub verifier: Arc<TokenVerifier>,
    pub metrics: Arc<AuthMetrics>,
}

impl AppState {
    pub fn new(service: AuthService, metrics: AuthMetrics) -> Self {
        let verifier = service.verifier();
        Self {
            service: Arc::new(service),
            verifier,
            metrics: Arc::new(metrics),
        }
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

impl FromRef<AppState> for Arc<AuthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/login", post(login))
        .route("/token/refresh", post(refresh))
        .route("/profile", get(profile))
        .route("/roles/me", get(my_roles))
        .route("/permissions/check", post(check_permissions))
        .with_state(state)
}
