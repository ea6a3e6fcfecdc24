//! Request-boundary error mapping.
//!
//! Domain errors become [`AppError`]s with a stable code. Anything
//! unclassified is rendered as a generic internal error; its cause is kept as
//! the error source and logged, never sent.

use crate::auth::AuthError;
use crate::engine::RegistrationError;
use crate::management::ManagementError;
use crate::store::StoreError;
use rsvp_web::AppError;

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::EventNotFound(id) => Self::not_found("Event", id),
            RegistrationError::RegistrationNotFound { event_id, .. } => {
                Self::not_found("Registration for event", event_id)
            },
            RegistrationError::CapacityExceeded { .. } => {
                Self::capacity_exceeded("Event is at full capacity")
            },
            RegistrationError::AlreadyRegistered { .. } => {
                Self::already_registered("Already registered for this event")
            },
            RegistrationError::UnknownUser(_) => Self::auth_invalid("Account no longer exists"),
            RegistrationError::Conflict | RegistrationError::Transient { .. } => {
                Self::transient("Too many concurrent registrations, please try again")
                    .with_source(err)
            },
            RegistrationError::Storage(_) | RegistrationError::Internal(_) => {
                Self::internal("An internal error occurred").with_source(err)
            },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::not_found(entity, id),
            StoreError::DuplicateEmail(_) => Self::validation("Email already in use"),
            StoreError::UnknownUser(_) => Self::auth_invalid("Account no longer exists"),
            StoreError::CapacityBelowConfirmed { .. } => Self::validation(err.to_string()),
            StoreError::Conflict { .. } => {
                Self::transient("Concurrent update, please try again").with_source(err)
            },
            StoreError::Database(_) => Self::internal("An internal error occurred").with_source(err),
        }
    }
}

impl From<ManagementError> for AppError {
    fn from(err: ManagementError) -> Self {
        match err {
            ManagementError::Validation(message) => Self::validation(message),
            ManagementError::NotFound(id) => Self::not_found("Event", id),
            ManagementError::Store(err) => err.into(),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::auth_invalid("Invalid credentials"),
            AuthError::Validation(message) => Self::validation(message),
            AuthError::Store(err) => err.into(),
            AuthError::Issuance(_) | AuthError::Hashing(_) => {
                Self::internal("An internal error occurred").with_source(err)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventId, UserId};
    use axum::http::StatusCode;

    #[test]
    fn registration_errors_map_to_stable_codes() {
        let event_id = EventId::new();
        let user_id = UserId::new();

        let cases = [
            (RegistrationError::EventNotFound(event_id), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                RegistrationError::RegistrationNotFound { event_id, user_id },
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                RegistrationError::CapacityExceeded { event_id, capacity: 1 },
                StatusCode::BAD_REQUEST,
                "CAPACITY_EXCEEDED",
            ),
            (
                RegistrationError::AlreadyRegistered { event_id, user_id },
                StatusCode::BAD_REQUEST,
                "ALREADY_REGISTERED",
            ),
            (RegistrationError::UnknownUser(user_id), StatusCode::UNAUTHORIZED, "AUTH_INVALID"),
            (
                RegistrationError::Transient { attempts: 5 },
                StatusCode::INTERNAL_SERVER_ERROR,
                "TRANSIENT",
            ),
            (
                RegistrationError::Storage("connection reset".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
            assert_eq!(app.code(), code);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let app: AppError = StoreError::Database("password authentication failed".to_string()).into();
        assert_eq!(app.message(), "An internal error occurred");
    }

    #[test]
    fn auth_failures_are_unauthorized() {
        let app: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(app.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(app.code(), "AUTH_INVALID");
    }
}
