//! Sign-up and log-in.

use super::{AuthError, IdentityProvider, PasswordHasher};
use crate::store::{StoreError, UserStore};
use crate::types::{Role, User, UserId, UserSummary};
use rsvp_core::environment::Clock;
use serde::Serialize;
use std::sync::Arc;

/// Credential plus the account it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    /// Bearer token
    pub token: String,
    /// The account
    pub user: UserSummary,
}

/// Account operations on top of a [`UserStore`] and an [`IdentityProvider`].
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    identity: Arc<dyn IdentityProvider>,
    hasher: PasswordHasher,
    clock: Arc<dyn Clock>,
}

impl AccountService {
    /// Create the service.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { users, identity, hasher: PasswordHasher::new(), clock }
    }

    /// Create a USER account and log it in.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when a field is blank or the email is taken.
    #[tracing::instrument(skip_all)]
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self.provision(email, password, Role::User).await?;
        tracing::info!(user_id = %user.id, "User signed up");
        self.session_for(&user)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    /// password, without saying which.
    #[tracing::instrument(skip_all)]
    pub async fn log_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_user_by_email(email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        let hasher = self.hasher;
        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session_for(&user)
    }

    /// Create an account with the given role.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] when a field is blank or the email is taken.
    pub async fn provision(&self, email: &str, password: &str, role: Role) -> Result<User, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || password.trim().is_empty() {
            return Err(AuthError::Validation("Email and password are required".to_string()));
        }

        let hasher = self.hasher;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))??;

        let user = User {
            id: UserId::new(),
            email,
            password_hash,
            role,
            created_at: self.clock.now(),
        };

        self.users.create_user(user).await.map_err(|e| match e {
            StoreError::DuplicateEmail(_) => AuthError::Validation("Email already in use".to_string()),
            other => AuthError::Store(other),
        })
    }

    /// Look up an account by email.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.find_user_by_email(normalize_email(email)).await?)
    }

    fn session_for(&self, user: &User) -> Result<AuthSession, AuthError> {
        let credential = self.identity.issue_credential(user.id, user.role)?;
        Ok(AuthSession { token: credential.token, user: UserSummary::from(user) })
    }
}

/// Emails are compared trimmed and lowercase.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
