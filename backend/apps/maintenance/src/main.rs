//! Maintenance Entry Point
//!
//! One-shot job meant for a scheduler: applies migrations, then purges
//! sessions past their refresh expiry and login attempts older than the
//! retention window. Uses `anyhow` for startup errors only.

use std::env;

use auth::{AuthConfig, PgAuthRepository};
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintenance=info,auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AuthConfig::from_env()?;
    // Fail on unusable keys here rather than in the API at first login
    auth::application::TokenIssuer::new(&config)?;

    let database_url = env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set in environment"))?;

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let repository = PgAuthRepository::new(pool.clone());
    let now = Utc::now();

    // A failed purge is reported but does not stop the other one
    let mut failed = false;

    match repository.purge_expired_sessions(now).await {
        Ok(deleted) => {
            tracing::info!(sessions_deleted = deleted, "Expired session purge completed");
        }
        Err(e) => {
            failed = true;
            tracing::warn!(error = %e, "Expired session purge failed");
        }
    }

    let cutoff = now - config.attempt_retention;
    match repository.purge_attempts_before(cutoff).await {
        Ok(deleted) => {
            tracing::info!(
                attempts_deleted = deleted,
                cutoff = %cutoff,
                "Login attempt purge completed"
            );
        }
        Err(e) => {
            failed = true;
            tracing::warn!(error = %e, "Login attempt purge failed");
        }
    }

    pool.close().await;

    if failed {
        anyhow::bail!("one or more purges failed");
    }
    Ok(())
}
