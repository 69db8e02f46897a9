use chrono::{DateTime, Duration, SecondsFormat, Utc};
use common_crypto::SymmetricKey;
use serde::Serialize;

use crate::claims::{self, Claims};
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};
use crate::principal::Principal;
use crate::token::{self, TokenBody};

/// Access/refresh pair handed to a client after login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub token_type: &'static str,
}

/// Builds token pairs. Holds the two keys for the life of the process;
/// nothing about issued tokens is remembered.
pub struct TokenMinter {
    config: TokenConfig,
    access_key: SymmetricKey,
    refresh_key: SymmetricKey,
}

impl TokenMinter {
    pub fn new(config: TokenConfig, access_key: SymmetricKey, refresh_key: SymmetricKey) -> Self {
        Self {
            config,
            access_key,
            refresh_key,
        }
    }

    pub fn mint(&self, principal: &Principal, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        let mut body = TokenBody::new(principal.username.clone(), now);
        claims::embed(&mut body, &Claims::from(principal))
            .map_err(|err| AuthError::Internal(format!("failed to set claims: {err}")))?;
        let footer = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        let access_expires_at = expiry(now, self.config.access_ttl)?;
        body.exp = access_expires_at;
        let access_token = token::encrypt(&self.access_key, &body, &footer)
            .map_err(|err| AuthError::Internal(format!("failed to seal access token: {err}")))?;

        let refresh_expires_at = expiry(now, self.config.refresh_ttl)?;
        body.exp = refresh_expires_at;
        let refresh_token = token::encrypt(&self.refresh_key, &body, &footer)
            .map_err(|err| AuthError::Internal(format!("failed to seal refresh token: {err}")))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
            token_type: "Bearer",
        })
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> AuthResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Internal(format!("token lifetime {ttl} overflows the clock")))
}
