//! Postgres access to the processing-event log.

pub mod processing_events;

pub use processing_events::{
    get_completed_run, insert_processing_event, insert_processing_events, list_completed_runs,
    list_events_in_window, ProcessingEventRow,
};

use std::{collections::HashSet, time::Duration};

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use synclog_core::AppConfig;
use thiserror::Error;

// Relative to crates/synclog-db/Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

/// Pool sizing, taken from the `SYNCLOG_DB_*` settings in [`AppConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Also the upper bound on how long a window query waits for a connection.
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Opens the event-log pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Applies pending migrations and returns how many were new.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    // A fresh database has no _sqlx_migrations table yet.
    let applied: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_all(pool)
    .await
    .map(|versions| versions.into_iter().collect())
    .unwrap_or_default();

    MIGRATOR.run(pool).await?;

    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count())
}

/// Round-trips `SELECT 1` on a pooled connection.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the pool cannot serve the query.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Clamps `at` into the range a `timestamptz` column can hold.
///
/// Run windows derived from extreme durations can start long before
/// anything Postgres accepts as a bind value.
pub(crate) fn clamp_to_store_range(at: DateTime<Utc>) -> DateTime<Utc> {
    let (min, max) = store_range();
    at.clamp(min, max)
}

fn store_range() -> (DateTime<Utc>, DateTime<Utc>) {
    let min = NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |d| d.and_utc());
    let max = NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .map_or(DateTime::<Utc>::MAX_UTC, |d| d.and_utc());
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extreme_window_bounds_are_clamped() {
        let (min, max) = store_range();
        assert_eq!(clamp_to_store_range(DateTime::<Utc>::MIN_UTC), min);
        assert_eq!(clamp_to_store_range(DateTime::<Utc>::MAX_UTC), max);
        assert_eq!(min.to_rfc3339(), "0001-01-01T00:00:00+00:00");
    }

    #[test]
    fn ordinary_timestamps_are_untouched() {
        let at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        assert_eq!(clamp_to_store_range(at), at);
    }
}
