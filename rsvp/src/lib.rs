//! RSVP - event registration with capacity-safe concurrent registrations.
//!
//! Users browse events and register for them; administrators manage the
//! catalog and review who registered. The hard part is the seat count: an
//! event must never hold more confirmed registrations than its capacity, no
//! matter how many requests race for the last seat.
//!
//! # Architecture
//!
//! ```text
//!   HTTP (axum)          api/  ──►  services  ──►  store (EventStore / UserStore)
//!                                     │
//!   register / cancel ────────► RegistrationEngine
//!                                 ├─ EventLocks (per-event async mutex)
//!                                 ├─ RegistrationReducer (pure decision)
//!                                 └─ conditional commit + bounded retry
//! ```
//!
//! The [`engine::RegistrationReducer`] decides; it never performs I/O. The
//! [`engine::RegistrationEngine`] drives it, serializing writers per event
//! in-process while the store's versioned commit catches writers in other
//! processes.
//!
//! # Modules
//!
//! - [`types`]: identifiers and entities
//! - [`store`]: storage contract with in-memory and PostgreSQL backends
//! - [`engine`]: register and cancel
//! - [`capacity`]: seat availability
//! - [`management`]: event CRUD
//! - [`reporting`]: registration listing and CSV export
//! - [`auth`]: accounts, passwords and bearer credentials
//! - [`api`], [`server`]: HTTP surface
//! - [`config`], [`metrics`], [`seed`]: process wiring

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod error;
pub mod management;
pub mod metrics;
pub mod reporting;
pub mod seed;
pub mod server;
pub mod store;
pub mod types;

pub use config::Config;
pub use engine::{RegistrationEngine, RegistrationError, RegistrationOutcome};
pub use server::{build_router, AppState};
