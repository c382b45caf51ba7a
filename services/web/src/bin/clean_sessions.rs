//! services/web/src/bin/clean_sessions.rs
//!
//! The out-of-band session retention sweep. Removes session tokens
//! untouched for longer than the configured retention window; the
//! response records and answers they pointed at are kept.

use chrono::{Duration, Utc};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use survey_core::ports::SessionResolver;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{adapters::db::DbAdapter, config::Config, error::ApiError};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool);

    let cutoff = Utc::now() - Duration::days(config.session_retention_days);
    let removed = db_adapter.clean(cutoff).await?;
    info!(
        removed,
        retention_days = config.session_retention_days,
        "Session sweep complete"
    );

    Ok(())
}
