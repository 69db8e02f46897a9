//! Versioned local (symmetric) token format.
//!
//! ```text
//! auth.v1.<base64url(nonce || ciphertext || tag)>[.<base64url(footer)>]
//! ```
//!
//! The body is JSON carrying the temporal claims plus application claims and
//! is sealed with AES-256-GCM. The footer stays readable but is bound to the
//! ciphertext through the associated data, so it cannot be swapped between
//! tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use common_crypto::{CryptoError, SymmetricKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const HEADER: &str = "auth.v1.";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token does not start with 'auth.v1.'")]
    UnsupportedVersion,
    #[error("token has no payload")]
    MissingPayload,
    #[error("token segment is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("token body is not valid JSON: {0}")]
    Body(#[from] serde_json::Error),
    #[error("token footer is not UTF-8")]
    Footer,
}

/// Decrypted token contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBody {
    pub sub: String,
    pub iat: DateTime<Utc>,
    pub nbf: DateTime<Utc>,
    pub exp: DateTime<Utc>,
    /// Application-defined claims, flattened next to the registered ones.
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl TokenBody {
    /// Body issued and valid from `now`, expiring at `now` until an
    /// expiration is set.
    pub fn new(subject: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            sub: subject.into(),
            iat: now,
            nbf: now,
            exp: now,
            custom: Map::new(),
        }
    }
}

/// A successfully opened token.
#[derive(Debug, Clone)]
pub struct OpenedToken {
    pub body: TokenBody,
    pub footer: Option<String>,
}

pub fn encrypt(key: &SymmetricKey, body: &TokenBody, footer: &str) -> Result<String, TokenError> {
    let plaintext = serde_json::to_vec(body)?;
    let aad = pre_auth_encode(&[HEADER.as_bytes(), footer.as_bytes()]);
    let sealed = key.seal(&plaintext, &aad)?;

    let mut token = String::with_capacity(HEADER.len() + sealed.len() * 4 / 3 + 8);
    token.push_str(HEADER);
    token.push_str(&URL_SAFE_NO_PAD.encode(sealed));
    if !footer.is_empty() {
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(footer.as_bytes()));
    }
    Ok(token)
}

pub fn decrypt(key: &SymmetricKey, token: &str) -> Result<OpenedToken, TokenError> {
    let rest = token
        .strip_prefix(HEADER)
        .ok_or(TokenError::UnsupportedVersion)?;

    let (payload, footer) = match rest.split_once('.') {
        Some((payload, footer)) => (payload, Some(footer)),
        None => (rest, None),
    };
    if payload.is_empty() {
        return Err(TokenError::MissingPayload);
    }

    let sealed = URL_SAFE_NO_PAD.decode(payload)?;
    let footer = match footer {
        Some(encoded) => {
            let bytes = URL_SAFE_NO_PAD.decode(encoded)?;
            Some(String::from_utf8(bytes).map_err(|_| TokenError::Footer)?)
        }
        None => None,
    };

    let aad = pre_auth_encode(&[
        HEADER.as_bytes(),
        footer.as_deref().unwrap_or_default().as_bytes(),
    ]);
    let plaintext = key.open(&sealed, &aad)?;
    let body = serde_json::from_slice(&plaintext)?;

    Ok(OpenedToken { body, footer })
}

/// Length-prefixed concatenation so that piece boundaries are unambiguous.
fn pre_auth_encode(pieces: &[&[u8]]) -> Vec<u8> {
    let total: usize = pieces.iter().map(|piece| piece.len() + 8).sum();
    let mut out = Vec::with_capacity(8 + total);
    out.extend_from_slice(&(pieces.len() as u64).to_le_bytes());
    for piece in pieces {
        out.extend_from_slice(&(piece.len() as u64).to_le_bytes());
        out.extend_from_slice(piece);
    }
    out
}
