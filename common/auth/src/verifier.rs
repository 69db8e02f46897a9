use chrono::{DateTime, Utc};
use common_crypto::SymmetricKey;
use tracing::debug;

use crate::claims::{self, Claims};
use crate::error::{AuthError, AuthResult};
use crate::token;

/// Which of the two keys a token is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Validates tokens minted by [`crate::TokenMinter`].
#[derive(Clone)]
pub struct TokenVerifier {
    access_key: SymmetricKey,
    refresh_key: SymmetricKey,
}

impl TokenVerifier {
    pub fn new(access_key: SymmetricKey, refresh_key: SymmetricKey) -> Self {
        Self {
            access_key,
            refresh_key,
        }
    }

    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        self.verify_kind(TokenKind::Access, token, now)
    }

    pub fn verify_refresh(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        self.verify_kind(TokenKind::Refresh, token, now)
    }

    fn verify_kind(&self, kind: TokenKind, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let key = match kind {
            TokenKind::Access => &self.access_key,
            TokenKind::Refresh => &self.refresh_key,
        };
        verify(token, key, now).inspect_err(|_| {
            debug!(kind = kind.as_str(), "token rejected");
        })
    }
}

/// Checks authenticity, expiry, not-before and the embedded claims, in that
/// order. Every failure collapses into [`AuthError::Authentication`]; the
/// concrete reason only reaches debug logs.
pub fn verify(token: &str, key: &SymmetricKey, now: DateTime<Utc>) -> AuthResult<Claims> {
    let opened = token::decrypt(key, token).map_err(|err| {
        debug!(error = %err, "token did not open");
        AuthError::Authentication
    })?;
    let body = opened.body;

    if now >= body.exp {
        debug!(exp = %body.exp, %now, "token expired");
        return Err(AuthError::Authentication);
    }
    if now < body.nbf {
        debug!(nbf = %body.nbf, %now, "token not yet valid");
        return Err(AuthError::Authentication);
    }

    claims::extract(&body).map_err(|err| {
        debug!(error = %err, "token claims did not decode");
        AuthError::Authentication
    })
}
