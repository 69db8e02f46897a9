pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod minter;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod token;
pub mod verifier;

pub use claims::{Claims, DecodeError};
pub use config::TokenConfig;
pub use error::{AuthError, AuthResult, FieldViolation, AUTHENTICATION_FAILED_MESSAGE};
pub use extractors::AuthContext;
pub use minter::{TokenMinter, TokenPair};
pub use password::{burn_verification, hash_password, verify_password};
pub use permissions::{check_permissions, effective_permissions, ensure_permissions, Role};
pub use principal::{Principal, PrincipalStatus};
pub use token::{TokenBody, TokenError};
pub use verifier::{TokenKind, TokenVerifier};
