//! Axum integration for the RSVP registration service.
//!
//! The HTTP layer is the imperative shell: it parses requests, calls into
//! the application services and maps their results to responses. Nothing in
//! this crate knows about events or registrations; it provides the pieces
//! every handler shares.
//!
//! - [`AppError`]: status code plus a stable error kind, rendered as JSON
//! - [`BearerToken`], [`CorrelationId`]: request extractors
//! - [`correlation_id_layer`]: request correlation and tracing span
//! - [`handlers::health_check`]: liveness endpoint

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{BearerToken, CorrelationId};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
