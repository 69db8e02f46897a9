use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::principal::Principal;
use crate::token::TokenBody;

/// Key under which the identity snapshot lives inside the token body.
pub const PROFILE_CLAIM: &str = "profile";

/// Identity snapshot embedded in every token.
///
/// Roles and permissions are intentionally absent: they are resolved from the
/// store on every decision so revocation takes effect immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl From<&Principal> for Claims {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.to_string(),
            username: principal.username.clone(),
            display_name: principal.display_name.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token carries no profile claim")]
    Missing,
    #[error("malformed profile claim: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Store `claims` in the application section of `body`, replacing any
/// previous snapshot.
pub fn embed(body: &mut TokenBody, claims: &Claims) -> Result<(), DecodeError> {
    let value = serde_json::to_value(claims)?;
    body.custom.insert(PROFILE_CLAIM.to_string(), value);
    Ok(())
}

pub fn extract(body: &TokenBody) -> Result<Claims, DecodeError> {
    let value = body.custom.get(PROFILE_CLAIM).ok_or(DecodeError::Missing)?;
    Ok(Claims::deserialize(value)?)
}
