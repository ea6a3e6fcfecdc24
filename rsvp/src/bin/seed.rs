//! Seed the configured database with the admin account and demo events.
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/rsvp cargo run --bin seed
//! ```

use anyhow::{bail, Context};
use rsvp::{
    config::Config,
    seed,
    server::{self, Backend},
};
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

    let config = Config::from_env().context("Invalid configuration")?;
    let (state, backend) = server::build_state(&config)
        .await
        .context("Failed to initialize storage")?;
    if backend == Backend::InMemory {
        bail!("DATABASE_URL must be set; seeding the in-memory store has no lasting effect");
    }

    let report = seed::seed(
        &state.accounts,
        &state.events,
        &config.seed.admin_email,
        &config.seed.admin_password,
    )
    .await?;

    tracing::info!(
        admin_created = report.admin_created,
        events_created = report.events_created,
        "Seeding complete"
    );
    Ok(())
}
