//! Read-side access to the `processing_events` log.
//!
//! The log is written by the mining process. Apart from the fixture import
//! helpers at the bottom of this module, nothing here mutates it.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use synclog_core::{AgentState, EventType, LogLevel, ProcessingEvent};

use crate::{clamp_to_store_range, DbError};

const EVENT_COLUMNS: &str = "id, user_id, event_type, agent_state, message, level, \
                             duration_ms, details, metadata, created_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `processing_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessingEventRow {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    pub agent_state: String,
    pub message: String,
    pub level: Option<String>,
    pub duration_ms: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<ProcessingEventRow> for ProcessingEvent {
    fn from(row: ProcessingEventRow) -> Self {
        ProcessingEvent {
            id: row.id,
            user_id: row.user_id,
            event_type: EventType::from(row.event_type),
            agent_state: AgentState::from(row.agent_state),
            message: row.message,
            level: row.level.as_deref().and_then(LogLevel::parse),
            duration_ms: row.duration_ms,
            details: row.details,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns the newest `limit` run-completion events for `user_id`.
///
/// Ordered by `created_at DESC`, ties broken by `id DESC` so pages are stable.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_completed_runs(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<ProcessingEvent>, DbError> {
    let rows = sqlx::query_as::<_, ProcessingEventRow>(&format!(
        "SELECT {EVENT_COLUMNS} \
         FROM processing_events \
         WHERE user_id = $1 AND agent_state = 'Completed' \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2"
    ))
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProcessingEvent::from).collect())
}

/// Fetches a single run-completion event by id, scoped to its owner.
///
/// Returns `None` when the id does not exist, belongs to another user, or is
/// not a `Completed` event.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_completed_run(
    pool: &PgPool,
    user_id: &str,
    run_id: &str,
) -> Result<Option<ProcessingEvent>, DbError> {
    let row = sqlx::query_as::<_, ProcessingEventRow>(&format!(
        "SELECT {EVENT_COLUMNS} \
         FROM processing_events \
         WHERE user_id = $1 AND id = $2 AND agent_state = 'Completed'"
    ))
    .bind(user_id)
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(ProcessingEvent::from))
}

/// Returns every event for `user_id` with `start <= created_at <= end`.
///
/// Results are ascending by `created_at`, then `id`. The reconstruction
/// engine relies on this ordering.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_events_in_window(
    pool: &PgPool,
    user_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<ProcessingEvent>, DbError> {
    let rows = sqlx::query_as::<_, ProcessingEventRow>(&format!(
        "SELECT {EVENT_COLUMNS} \
         FROM processing_events \
         WHERE user_id = $1 AND created_at >= $2 AND created_at <= $3 \
         ORDER BY created_at ASC, id ASC"
    ))
    .bind(user_id)
    .bind(clamp_to_store_range(start))
    .bind(clamp_to_store_range(end))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProcessingEvent::from).collect())
}

// ---------------------------------------------------------------------------
// Fixture import
// ---------------------------------------------------------------------------

/// Appends one event. An id that already exists is left untouched.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_processing_event(
    pool: &PgPool,
    event: &ProcessingEvent,
) -> Result<bool, DbError> {
    let result = insert_query(event).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Appends a batch of events inside a single transaction.
///
/// Returns the number of rows inserted; duplicates are skipped. If any insert
/// fails the whole batch is rolled back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn insert_processing_events(
    pool: &PgPool,
    events: &[ProcessingEvent],
) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;

    for event in events {
        let result = insert_query(event).execute(&mut *tx).await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

fn insert_query(
    event: &ProcessingEvent,
) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(
        "INSERT INTO processing_events \
             (id, user_id, event_type, agent_state, message, level, \
              duration_ms, details, metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(&event.id)
    .bind(&event.user_id)
    .bind(event.event_type.as_str())
    .bind(event.agent_state.as_str())
    .bind(&event.message)
    .bind(event.level.map(LogLevel::as_str))
    .bind(event.duration_ms)
    .bind(&event.details)
    .bind(&event.metadata)
    .bind(event.created_at)
}
