//! HTTP server: shared state, routing and graceful shutdown.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;

use crate::auth::{IdentityProvider, JwtIdentityProvider};
use crate::config::Config;
use crate::store::{InMemoryStore, PostgresStore, StoreError};
use rsvp_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Resolve on Ctrl+C or SIGTERM.
///
/// If a signal handler cannot be installed the error is logged and that
/// signal is ignored.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

/// Which store the state was built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Process-local; lost on exit
    InMemory,
    /// `DATABASE_URL`
    Postgres,
}

/// Build the application state from configuration.
///
/// Connects and migrates PostgreSQL when `DATABASE_URL` is set, otherwise
/// uses the in-memory store.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if the database is unreachable or a
/// migration fails.
pub async fn build_state(config: &Config) -> Result<(AppState, Backend), StoreError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(
        config.auth.jwt_secret.as_bytes(),
        config.token_ttl(),
        clock.clone(),
    ));
    let retry = config.retry_policy();

    match &config.database.url {
        Some(url) => {
            let store = PostgresStore::connect(
                url,
                config.database.max_connections,
                Duration::from_secs(config.database.connect_timeout),
            )
            .await?;
            store.migrate().await?;
            tracing::info!("Migrations applied");

            Ok((AppState::new(Arc::new(store), identity, clock, retry), Backend::Postgres))
        },
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            let store = Arc::new(InMemoryStore::new());
            Ok((AppState::new(store, identity, clock, retry), Backend::InMemory))
        },
    }
}
