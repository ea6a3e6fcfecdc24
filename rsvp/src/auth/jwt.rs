//! HS256 JSON Web Tokens.
//!
//! Claims: `sub` (user id), `role`, `iat`, `exp`. Expiry is checked against
//! the injected clock rather than the system clock.

use super::{AuthError, Credential, IdentityProvider};
use crate::types::{Principal, Role, UserId};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsvp_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default credential lifetime in seconds (7 days).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    role: Role,
    iat: i64,
    exp: i64,
}

/// [`IdentityProvider`] backed by signed JWTs.
pub struct JwtIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl JwtIdentityProvider {
    /// Create a provider signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
            clock,
        }
    }
}

impl IdentityProvider for JwtIdentityProvider {
    fn issue_credential(&self, user_id: UserId, role: Role) -> Result<Credential, AuthError> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Issuance(e.to_string()))?;

        Ok(Credential { token, expires_at })
    }

    fn verify(&self, credential: &str) -> Result<Principal, AuthError> {
        let claims = decode::<Claims>(credential, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Credential rejected");
                AuthError::InvalidCredentials
            })?
            .claims;

        if claims.exp <= self.clock.now().timestamp() {
            tracing::debug!(user_id = %claims.sub, "Credential expired");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Principal { user_id: claims.sub, role: claims.role })
    }
}

impl std::fmt::Debug for JwtIdentityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtIdentityProvider")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rsvp_testing::test_clock;

    fn ttl() -> Duration {
        Duration::seconds(DEFAULT_TOKEN_TTL_SECS)
    }

    fn provider(clock: rsvp_testing::FixedClock) -> JwtIdentityProvider {
        JwtIdentityProvider::new(b"test-secret", ttl(), Arc::new(clock))
    }

    #[test]
    fn issued_credential_verifies_to_same_principal() {
        let provider = provider(test_clock());
        let user_id = UserId::new();

        let credential = provider.issue_credential(user_id, Role::Admin).unwrap();
        let principal = provider.verify(&credential.token).unwrap();

        assert_eq!(principal, Principal { user_id, role: Role::Admin });
        assert_eq!(credential.expires_at, test_clock().now() + ttl());
    }

    #[test]
    fn expired_credential_is_rejected() {
        let clock = test_clock();
        let provider = provider(clock.clone());
        let credential = provider.issue_credential(UserId::new(), Role::User).unwrap();

        clock.advance(ttl() + Duration::seconds(1));

        assert_eq!(provider.verify(&credential.token), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let ours = provider(test_clock());
        let theirs = JwtIdentityProvider::new(b"other-secret", ttl(), Arc::new(test_clock()));
        let credential = theirs.issue_credential(UserId::new(), Role::Admin).unwrap();

        assert_eq!(ours.verify(&credential.token), Err(AuthError::InvalidCredentials));
        assert_eq!(ours.verify("not-a-token"), Err(AuthError::InvalidCredentials));
    }
}
