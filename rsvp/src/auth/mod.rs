//! Identity Provider.
//!
//! Issues bearer credentials binding a user to a role and verifies them on
//! every request. Accounts are email + password; passwords are stored as
//! Argon2id PHC strings.

use crate::store::StoreError;
use crate::types::{Principal, Role, UserId};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod accounts;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use accounts::{AccountService, AuthSession};
pub use jwt::JwtIdentityProvider;
pub use middleware::{Authenticated, RequireAdmin};
pub use password::PasswordHasher;

/// Authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown user, wrong password, or a bad or expired credential.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Input rejected.
    #[error("{0}")]
    Validation(String),

    /// Credential could not be issued.
    #[error("credential issuance failed: {0}")]
    Issuance(String),

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// Store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An issued bearer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Opaque token
    pub token: String,
    /// When the token stops verifying
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies credentials.
pub trait IdentityProvider: Send + Sync {
    /// Issue a credential for `user_id` acting as `role`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Issuance`] if the token cannot be signed.
    fn issue_credential(&self, user_id: UserId, role: Role) -> Result<Credential, AuthError>;

    /// Verify a credential.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for malformed, forged or expired
    /// credentials.
    fn verify(&self, credential: &str) -> Result<Principal, AuthError>;
}
