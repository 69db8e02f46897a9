use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid principal status '{0}'")]
pub struct UnknownStatus(pub String);

/// Account status of a principal. Only `Enabled` may authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PrincipalStatus {
    Unspecified,
    Enabled,
    Disabled,
    Terminated,
}

const STATUS_NAMES: &[(PrincipalStatus, &str)] = &[
    (PrincipalStatus::Unspecified, "UNSPECIFIED"),
    (PrincipalStatus::Enabled, "ENABLED"),
    (PrincipalStatus::Disabled, "DISABLED"),
    (PrincipalStatus::Terminated, "TERMINATED"),
];

impl PrincipalStatus {
    pub fn as_str(&self) -> &'static str {
        STATUS_NAMES
            .iter()
            .find(|(status, _)| status == self)
            .map(|(_, name)| *name)
            .unwrap_or("UNSPECIFIED")
    }
}

impl fmt::Display for PrincipalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        STATUS_NAMES
            .iter()
            .find(|(_, name)| *name == value)
            .map(|(status, _)| *status)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

impl TryFrom<String> for PrincipalStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PrincipalStatus> for String {
    fn from(value: PrincipalStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Authenticable identity as read from the store.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub status: PrincipalStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    #[serde(skip)]
    pub password_hash: String,
}

impl Principal {
    pub fn is_enabled(&self) -> bool {
        self.status == PrincipalStatus::Enabled
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("display_name", &self.display_name)
            .field("status", &self.status)
            .field("password_hash", &"***redacted***")
            .finish_non_exhaustive()
    }
}
