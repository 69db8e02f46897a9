use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common_auth::{
    burn_verification, effective_permissions, ensure_permissions, verify_password, AuthError,
    AuthResult, Claims, FieldViolation, Principal, Role, TokenMinter, TokenPair, TokenVerifier,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::store::{PrincipalStore, StoreError};

pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> AuthResult<()> {
        let mut violations = Vec::new();

        if self.username.trim().is_empty() {
            violations.push(FieldViolation::new(
                "username",
                "Username must not be empty",
            ));
        }
        if self.password.is_empty() {
            violations.push(FieldViolation::new(
                "password",
                "Password must not be empty",
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(AuthError::Validation(violations))
        }
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***redacted***")
            .finish()
    }
}

#[derive(Deserialize, Serialize)]
pub struct RefreshRequest {
    #[serde(default, alias = "refreshToken")]
    pub token: String,
}

/// Authentication and authorization entry points consumed by the HTTP layer.
///
/// Holds no mutable state: the minter and verifier are fixed at construction
/// and permissions are re-read from the store on every call.
pub struct AuthService {
    store: Arc<dyn PrincipalStore>,
    minter: TokenMinter,
    verifier: Arc<TokenVerifier>,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn PrincipalStore>,
        minter: TokenMinter,
        verifier: Arc<TokenVerifier>,
    ) -> Self {
        Self {
            store,
            minter,
            verifier,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn verifier(&self) -> Arc<TokenVerifier> {
        self.verifier.clone()
    }

    pub async fn login(&self, request: &LoginRequest, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        request.validate()?;
        let username = request.username.trim();

        let principal = self
            .load_principal("login", username)
            .await?;

        let Some(principal) = principal else {
            burn_verification(&request.password);
            return Err(AuthError::Authentication);
        };

        if !verify_password(&principal.password_hash, &request.password) {
            debug!(username, "password mismatch");
            return Err(AuthError::Authentication);
        }
        if !principal.is_enabled() {
            debug!(username, status = %principal.status, "login for inactive principal");
            return Err(AuthError::Authentication);
        }

        self.mint("login", &principal, now)
    }

    /// Rotates a refresh token into a fresh pair. The principal is re-read so
    /// a disabled account cannot keep refreshing.
    pub async fn refresh(&self, request: &RefreshRequest, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        let token = request.token.trim();
        if token.is_empty() {
            return Err(AuthError::Authentication);
        }

        let claims = self.verifier.verify_refresh(token, now)?;
        let principal = self.require_enabled("refresh", &claims).await?;
        self.mint("refresh", &principal, now)
    }

    /// Single claims extraction for a raw access token.
    pub fn authenticate(&self, access_token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        self.verifier.verify_access(access_token, now)
    }

    pub async fn profile(&self, claims: &Claims) -> AuthResult<Principal> {
        self.require_enabled("profile", claims).await
    }

    pub async fn list_my_roles(&self, claims: &Claims) -> AuthResult<Vec<Role>> {
        self.resolve_roles("list_my_roles", &claims.username).await
    }

    pub async fn resolve_permissions(&self, claims: &Claims) -> AuthResult<BTreeSet<String>> {
        let roles = self
            .resolve_roles("resolve_permissions", &claims.username)
            .await?;
        Ok(effective_permissions(&roles))
    }

    /// `Ok(())` iff the caller holds every permission in `wanted`.
    pub async fn require_permissions(&self, claims: &Claims, wanted: &[&str]) -> AuthResult<()> {
        if wanted.is_empty() {
            return Err(AuthError::InvalidArgument(
                "no permissions specified".to_string(),
            ));
        }

        let roles = self
            .resolve_roles("require_permissions", &claims.username)
            .await?;
        let having: Vec<String> = effective_permissions(&roles).into_iter().collect();

        ensure_permissions(&having, wanted).inspect_err(|err| {
            if let AuthError::PermissionDenied { missing } = err {
                debug!(username = %claims.username, ?missing, "permission check denied");
            }
        })
    }

    async fn require_enabled(&self, method: &'static str, claims: &Claims) -> AuthResult<Principal> {
        match self.load_principal(method, &claims.username).await? {
            Some(principal) if principal.is_enabled() => Ok(principal),
            Some(principal) => {
                debug!(method, username = %claims.username, status = %principal.status, "inactive principal");
                Err(AuthError::Authentication)
            }
            None => {
                debug!(method, username = %claims.username, "principal vanished");
                Err(AuthError::Authentication)
            }
        }
    }

    async fn load_principal(&self, method: &'static str, username: &str) -> AuthResult<Option<Principal>> {
        self.bounded(self.store.principal_by_username(username))
            .await
            .map_err(|err| {
                error!(method, username, error = %err, "failed to get principal");
                AuthError::internal(err)
            })
    }

    async fn resolve_roles(&self, method: &'static str, username: &str) -> AuthResult<Vec<Role>> {
        self.bounded(self.store.roles_for_username(username))
            .await
            .map_err(|err| {
                error!(method, username, error = %err, "failed to list roles");
                AuthError::internal(err)
            })
    }

    fn mint(&self, method: &'static str, principal: &Principal, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        self.minter.mint(principal, now).inspect_err(|err| {
            error!(method, username = %principal.username, error = %err, "failed to generate token");
        })
    }

    /// Runs a store call under the configured deadline. An elapsed deadline is
    /// an error, never a partial answer.
    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.store_timeout, "store call timed out");
                Err(StoreError::Timeout(self.store_timeout))
            }
        }
    }
}
