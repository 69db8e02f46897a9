use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use chrono::Utc;

use crate::claims::Claims;
use crate::error::{AuthError, AuthResult};
use crate::verifier::TokenVerifier;

/// Claims of the caller's access token, verified once at the HTTP boundary
/// and then passed explicitly to whatever needs them.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: Claims,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<TokenVerifier>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);

        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::Authentication)?;

        let token = parse_bearer(header_value)?;
        let claims = verifier.verify_access(&token, Utc::now())?;

        Ok(Self { claims })
    }
}

fn parse_bearer(value: &axum::http::HeaderValue) -> AuthResult<String> {
    let raw = value
        .to_str()
        .map_err(|_| AuthError::Authentication)?
        .trim();

    let token = raw
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Authentication)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::Authentication);
    }

    Ok(token.to_owned())
}
