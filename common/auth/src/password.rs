use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use once_cell::sync::Lazy;
use rand_core::OsRng;

use crate::error::{AuthError, AuthResult, FieldViolation};

/// Hash compared against when the principal does not exist, so a miss costs
/// the same as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> =
    Lazy::new(|| hash_password("not-a-real-account-password").ok());

/// One-way comparison of `secret` against a stored PHC hash.
/// An unparseable stored hash never matches.
pub fn verify_password(stored_hash: &str, secret: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Spend one verification on a throwaway hash. Always returns `false`.
pub fn burn_verification(secret: &str) -> bool {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(hash, secret);
    }
    false
}

pub fn hash_password(secret: &str) -> AuthResult<String> {
    if secret.trim().is_empty() {
        return Err(AuthError::Validation(vec![FieldViolation::new(
            "password",
            "Password must not be empty",
        )]));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthError::Internal(format!("failed to hash password: {err}")))
}
