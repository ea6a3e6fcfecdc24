//! RSVP HTTP server.

use anyhow::Context;
use rsvp::{
    config::Config,
    seed,
    server::{self, Backend},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rsvp=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RSVP server");

    let config = Config::from_env().context("Invalid configuration")?;
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, using the development secret");
    }

    if config.metrics.enabled {
        rsvp::metrics::install_prometheus(config.metrics_addr()?)?;
    }

    let (state, backend) = server::build_state(&config)
        .await
        .context("Failed to initialize storage")?;

    // An in-memory catalog starts empty on every run.
    if backend == Backend::InMemory {
        let report = seed::seed(
            &state.accounts,
            &state.events,
            &config.seed.admin_email,
            &config.seed.admin_password,
        )
        .await?;
        info!(events = report.events_created, "Seeded in-memory store");
    }

    let app = server::build_router(state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(address = %addr, ?backend, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
