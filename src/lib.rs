#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod bmi;
pub mod calendar;
pub mod config;
pub mod db;
pub mod env;
pub mod error;
pub mod mailer;
pub mod models;
pub mod plan_parser;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use std::sync::Arc;
use std::time::Duration;

use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};

use config::AppConfig;
use error::AppError;
use mailer::EmailSender;
use telemetry::TelemetryFairing;

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("{0}")]
    Rocket(#[from] rocket::Error),
    #[error("{0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

pub fn init_rocket(
    pool: SqlitePool,
    config: AppConfig,
    mailer: Arc<dyn EmailSender>,
) -> Rocket<Build> {
    info!("Starting fitness hub");

    rocket::build()
        .manage(pool)
        .manage(config)
        .manage(mailer)
        .mount("/api", api::routes())
        .register("/", api::catchers())
        .attach(TelemetryFairing)
}

/// Purges expired sessions once an hour for the lifetime of the process.
pub fn spawn_session_cleanup(pool: SqlitePool) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;

        loop {
            match db::clean_expired_sessions(&pool).await {
                Ok(count) if count > 0 => info!("Cleaned up {} expired sessions", count),
                Ok(_) => {}
                Err(e) => error!("Failed to clean expired sessions: {}", e),
            }

            tokio::time::sleep(SESSION_CLEANUP_INTERVAL).await;
        }
    });
}
