use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

pub const AUTHENTICATION_FAILED_MESSAGE: &str =
    "Your credentials are not valid. Please check them and try again.";
const VALIDATION_FAILED_MESSAGE: &str =
    "Request is not valid or incomplete. See violations for details.";
const INTERNAL_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Single field problem reported back with a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub description: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, description: impl Into<String>) -> Self {
        Self {
            field,
            description: description.into(),
        }
    }
}

/// Failure taxonomy shared by the token engine and the service boundary.
///
/// `Authentication` deliberately carries no cause: bad secrets, unknown
/// principals, disabled accounts and every flavour of broken token render
/// identically.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request validation failed")]
    Validation(Vec<FieldViolation>),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("authentication failed")]
    Authentication,
    /// Lookup miss for admin-facing callers only. Login, refresh and profile
    /// never return it; they report `Authentication` instead.
    #[error("principal not found")]
    NotFound,
    #[error("missing permissions: {}", .missing.join(", "))]
    PermissionDenied { missing: Vec<String> },
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Stable machine readable code, also sent as `X-Error-Code`.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::Validation(_) => "VALIDATION_FAILED",
            AuthError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AuthError::Authentication => "UNAUTHENTICATED",
            AuthError::NotFound => "NOT_FOUND",
            AuthError::PermissionDenied { .. } => "PERMISSION_DENIED",
            AuthError::Internal(_) => "SERVER_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) | AuthError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AuthError::Authentication => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    violations: Vec<FieldViolation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing_permissions: Vec<String>,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            AuthError::Validation(violations) => ErrorBody {
                code,
                message: VALIDATION_FAILED_MESSAGE.to_string(),
                violations,
                missing_permissions: Vec::new(),
            },
            AuthError::PermissionDenied { missing } => ErrorBody {
                code,
                message: format!(
                    "You do not have sufficient permissions. Required [{}] to perform this action.",
                    missing.join(", ")
                ),
                violations: Vec::new(),
                missing_permissions: missing,
            },
            AuthError::InvalidArgument(message) => ErrorBody {
                code,
                message,
                violations: Vec::new(),
                missing_permissions: Vec::new(),
            },
            AuthError::Authentication => ErrorBody {
                code,
                message: AUTHENTICATION_FAILED_MESSAGE.to_string(),
                violations: Vec::new(),
                missing_permissions: Vec::new(),
            },
            AuthError::NotFound => ErrorBody {
                code,
                message: "The requested resource does not exist.".to_string(),
                violations: Vec::new(),
                missing_permissions: Vec::new(),
            },
            // Detail stays in server logs.
            AuthError::Internal(_) => ErrorBody {
                code,
                message: INTERNAL_MESSAGE.to_string(),
                violations: Vec::new(),
                missing_permissions: Vec::new(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        response
            .headers_mut()
            .insert("X-Error-Code", HeaderValue::from_static(code));
        response
    }
}
