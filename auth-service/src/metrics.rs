use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use common_auth::AuthError;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct AuthMetrics {
    registry: Registry,
    login_attempts: IntCounterVec,
    refresh_attempts: IntCounterVec,
    permission_checks: IntCounterVec,
}

/// Low-cardinality outcome label for a service result.
pub fn outcome<T>(result: &Result<T, AuthError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(AuthError::Validation(_)) | Err(AuthError::InvalidArgument(_)) => "invalid",
        Err(AuthError::Authentication) | Err(AuthError::NotFound) => "unauthenticated",
        Err(AuthError::PermissionDenied { .. }) => "denied",
        Err(AuthError::Internal(_)) => "error",
    }
}

impl AuthMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let login_attempts = IntCounterVec::new(
            Opts::new(
                "auth_login_attempts_total",
                "Count of login attempts grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(login_attempts.clone()))?;

        let refresh_attempts = IntCounterVec::new(
            Opts::new(
                "auth_refresh_attempts_total",
                "Count of refresh token rotations grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(refresh_attempts.clone()))?;

        let permission_checks = IntCounterVec::new(
            Opts::new(
                "auth_permission_checks_total",
                "Count of permission decisions grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(permission_checks.clone()))?;

        Ok(Self {
            registry,
            login_attempts,
            refresh_attempts,
            permission_checks,
        })
    }

    pub fn login_attempt(&self, outcome: &str) {
        self.login_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn refresh_attempt(&self, outcome: &str) {
        self.refresh_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn permission_check(&self, outcome: &str) {
        self.permission_checks.with_label_values(&[outcome]).inc();
    }

    pub fn render(&self) -> Result<Response> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )
            .body(Body::from(buffer))?;
        Ok(response)
    }
}
