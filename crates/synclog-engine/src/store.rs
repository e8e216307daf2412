//! The read interface the engine needs from the processing log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use synclog_core::ProcessingEvent;

use crate::error::StoreError;

/// Ordered, read-only range queries over the processing log.
///
/// Implemented by [`PgEventLog`] (postgres) and
/// [`MemoryEventLog`](crate::memory::MemoryEventLog) (tests, fixtures).
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Newest-first `Completed` events for `user_id`, at most `limit`.
    async fn list_completed_runs(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ProcessingEvent>, StoreError>;

    /// The `Completed` event with id `run_id`, if it belongs to `user_id`.
    async fn get_completed_run(
        &self,
        user_id: &str,
        run_id: &str,
    ) -> Result<Option<ProcessingEvent>, StoreError>;

    /// Every event for `user_id` with `start <= created_at <= end`, ascending.
    async fn list_events_in_window(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessingEvent>, StoreError>;

    /// Cheap liveness check. Defaults to always healthy.
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// [`EventLog`] over the `processing_events` table.
#[derive(Clone)]
pub struct PgEventLog {
    pool: PgPool,
}

impl PgEventLog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EventLog for PgEventLog {
    async fn list_completed_runs(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ProcessingEvent>, StoreError> {
        Ok(synclog_db::list_completed_runs(&self.pool, user_id, i64::from(limit)).await?)
    }

    async fn get_completed_run(
        &self,
        user_id: &str,
        run_id: &str,
    ) -> Result<Option<ProcessingEvent>, StoreError> {
        Ok(synclog_db::get_completed_run(&self.pool, user_id, run_id).await?)
    }

    async fn list_events_in_window(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessingEvent>, StoreError> {
        Ok(synclog_db::list_events_in_window(&self.pool, user_id, start, end).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(synclog_db::health_check(&self.pool).await?)
    }
}
