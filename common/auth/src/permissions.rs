use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Named permission bundle. Permission names follow `resource:action` but are
/// otherwise opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
}

/// Union of the permissions of every role; duplicates collapse.
pub fn effective_permissions(roles: &[Role]) -> BTreeSet<String> {
    roles
        .iter()
        .flat_map(|role| role.permissions.iter().cloned())
        .collect()
}

/// Returns the entries of `want` absent from `have`, in `want` order.
///
/// An empty `want` is a caller bug and is rejected rather than read as
/// "nothing required".
pub fn check_permissions<H, W>(have: &[H], want: &[W]) -> AuthResult<Vec<String>>
where
    H: AsRef<str>,
    W: AsRef<str>,
{
    if want.is_empty() {
        return Err(AuthError::InvalidArgument(
            "no permissions specified".to_string(),
        ));
    }

    let having: HashSet<&str> = have.iter().map(|p| p.as_ref()).collect();
    Ok(want
        .iter()
        .map(|p| p.as_ref())
        .filter(|permission| !having.contains(permission))
        .map(str::to_string)
        .collect())
}

/// Grants access iff nothing is missing.
pub fn ensure_permissions<H, W>(have: &[H], want: &[W]) -> AuthResult<()>
where
    H: AsRef<str>,
    W: AsRef<str>,
{
    let missing = check_permissions(have, want)?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::PermissionDenied { missing })
    }
}
