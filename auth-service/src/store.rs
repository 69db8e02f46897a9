use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use common_auth::{Principal, PrincipalStatus, Role};
use sqlx::{FromRow, PgPool, Row};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid row: {0}")]
    InvalidRow(String),
    #[error("store call exceeded {0:?}")]
    Timeout(std::time::Duration),
}

/// Narrow read interface over the relational store.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// `Ok(None)` when no principal carries `username`.
    async fn principal_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError>;

    /// Every role assigned to `username`, each with its permission names.
    /// A principal without roles yields an empty list.
    async fn roles_for_username(&self, username: &str) -> Result<Vec<Role>, StoreError>;
}

#[derive(Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    display_name: String,
    permissions: Vec<String>,
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn principal_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let row = sqlx::query(
            "SELECT id, username, display_name, hash_password, status, created_at, created_by, updated_at, updated_by
             FROM users WHERE username = $1 LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<PrincipalStatus>()
            .map_err(|err| StoreError::InvalidRow(err.to_string()))?;

        Ok(Some(Principal {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            display_name: row.try_get("display_name")?,
            status,
            created_at: row.try_get("created_at")?,
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
            updated_by: row.try_get("updated_by")?,
            password_hash: row.try_get("hash_password")?,
        }))
    }

    async fn roles_for_username(&self, username: &str) -> Result<Vec<Role>, StoreError> {
        let rows = sqlx::query_as::<_, RoleRow>(
            "SELECT r.id, r.name, r.display_name, ARRAY_AGG(rh.permission_name) AS permissions
             FROM user_has_role AS ur
             INNER JOIN role r ON r.name = ur.role_name
             INNER JOIN role_has_permission AS rh ON rh.role_name = ur.role_name
             WHERE ur.username = $1
             GROUP BY r.id, r.name, r.display_name, ur.username",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Role {
                id: row.id,
                name: row.name,
                display_name: row.display_name,
                permissions: row.permissions,
            })
            .collect())
    }
}

/// Map-backed store for tests and local runs without Postgres.
#[derive(Default)]
pub struct InMemoryPrincipalStore {
    principals: RwLock<HashMap<String, Principal>>,
    roles: RwLock<HashMap<String, Role>>,
    assignments: RwLock<HashMap<String, Vec<String>>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_principal(&self, principal: Principal) {
        let mut guard = self.principals.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(principal.username.clone(), principal);
    }

    pub fn insert_role(&self, role: Role) {
        let mut guard = self.roles.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(role.name.clone(), role);
    }

    pub fn assign_role(&self, username: &str, role_name: &str) {
        let mut guard = self.assignments.write().unwrap_or_else(|e| e.into_inner());
        guard
            .entry(username.to_string())
            .or_default()
            .push(role_name.to_string());
    }

    pub fn set_status(&self, username: &str, status: PrincipalStatus) {
        let mut guard = self.principals.write().unwrap_or_else(|e| e.into_inner());
        if let Some(principal) = guard.get_mut(username) {
            principal.status = status;
        }
    }

    pub fn revoke_role(&self, username: &str, role_name: &str) {
        let mut guard = self.assignments.write().unwrap_or_else(|e| e.into_inner());
        if let Some(names) = guard.get_mut(username) {
            names.retain(|name| name != role_name);
        }
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn principal_by_username(&self, username: &str) -> Result<Option<Principal>, StoreError> {
        let guard = self.principals.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(username).cloned())
    }

    async fn roles_for_username(&self, username: &str) -> Result<Vec<Role>, StoreError> {
        let assignments = self.assignments.read().unwrap_or_else(|e| e.into_inner());
        let roles = self.roles.read().unwrap_or_else(|e| e.into_inner());

        // Mirrors the inner join: roles without permissions do not show up.
        Ok(assignments
            .get(username)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|name| roles.get(name))
                    .filter(|role| !role.permissions.is_empty())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn principal(username: &str) -> Principal {
        let now = Utc::now();
        Principal {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: username.to_uppercase(),
            status: PrincipalStatus::Enabled,
            created_at: now,
            created_by: "test".into(),
            updated_at: now,
            updated_by: "test".into(),
            password_hash: String::new(),
        }
    }

    fn role(id: i64, name: &str, permissions: &[&str]) -> Role {
        Role {
            id,
            name: name.into(),
            display_name: name.into(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn unknown_username_is_none() {
        let store = InMemoryPrincipalStore::new();
        assert!(store.principal_by_username("ghost").await.unwrap().is_none());
        assert!(store.roles_for_username("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn roles_follow_assignments() {
        let store = InMemoryPrincipalStore::new();
        store.insert_principal(principal("ada"));
        store.insert_role(role(1, "reader", &["x:read"]));
        store.insert_role(role(2, "writer", &["x:read", "x:write"]));
        store.insert_role(role(3, "empty", &[]));
        store.assign_role("ada", "reader");
        store.assign_role("ada", "empty");

        let names: Vec<_> = store
            .roles_for_username("ada")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["reader"]);

        store.assign_role("ada", "writer");
        store.revoke_role("ada", "reader");
        let roles = store.roles_for_username("ada").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].name, "writer");
    }
}
