//! Run aggregation: one [`SyncRun`] per run-completion event.
//!
//! Counters are the producer's own totals from the completion event's
//! metadata. They are copied, never recomputed from the window.

use synclog_core::{AgentState, ProcessingEvent, RunStatus, SyncRun};

use crate::error::ReconstructError;
use crate::store::EventLog;

/// Maps a completion event to its run summary. Missing counters read as 0.
#[must_use]
pub fn sync_run_from_event(event: &ProcessingEvent) -> SyncRun {
    let signals_found = event.metadata_count("signals_found");
    let errors = event.metadata_count("errors");
    let duration_ms = event.duration_or_zero();

    SyncRun {
        id: event.id.clone(),
        user_id: event.user_id.clone(),
        started_at: SyncRun::started_at_for(event.created_at, duration_ms),
        completed_at: event.created_at,
        duration_ms,
        signals_found,
        urls_processed: event.metadata_count("urls_processed"),
        skipped: event.metadata_count("skipped"),
        errors,
        status: RunStatus::classify(signals_found, errors),
    }
}

/// Maps a page of completion events to runs, preserving order.
///
/// Events in any other agent state are ignored.
#[must_use]
pub fn aggregate_runs(events: &[ProcessingEvent]) -> Vec<SyncRun> {
    events
        .iter()
        .filter(|e| e.agent_state == AgentState::Completed)
        .map(sync_run_from_event)
        .collect()
}

/// Lists the newest `limit` runs for `user_id`.
///
/// # Errors
///
/// Returns [`ReconstructError::RunsUnavailable`] if the event store query fails.
pub async fn list_runs(
    log: &dyn EventLog,
    user_id: &str,
    limit: u32,
) -> Result<Vec<SyncRun>, ReconstructError> {
    let events = log
        .list_completed_runs(user_id, limit)
        .await
        .map_err(|source| {
            tracing::warn!(user_id, error = %source, "failed to list completed runs");
            ReconstructError::RunsUnavailable {
                user_id: user_id.to_string(),
                source,
            }
        })?;
    Ok(aggregate_runs(&events))
}

/// Looks up a single run by its completion event id.
///
/// # Errors
///
/// Returns [`ReconstructError::RunNotFound`] if no completion event with that
/// id belongs to `user_id`, or [`ReconstructError::Unavailable`] if the store
/// query fails.
pub async fn find_run(
    log: &dyn EventLog,
    user_id: &str,
    run_id: &str,
) -> Result<SyncRun, ReconstructError> {
    let event = log
        .get_completed_run(user_id, run_id)
        .await
        .map_err(|source| ReconstructError::Unavailable {
            run_id: run_id.to_string(),
            source,
        })?
        .ok_or_else(|| ReconstructError::RunNotFound {
            run_id: run_id.to_string(),
        })?;
    Ok(sync_run_from_event(&event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{completed_at, event_at};
    use serde_json::json;

    #[test]
    fn counters_come_from_metadata() {
        let event = completed_at(
            "run-1",
            100,
            30_000,
            json!({"signals_found": 4, "urls_processed": 12, "skipped": 7, "errors": 1}),
        );
        let run = sync_run_from_event(&event);

        assert_eq!(run.id, "run-1");
        assert_eq!(run.signals_found, 4);
        assert_eq!(run.urls_processed, 12);
        assert_eq!(run.skipped, 7);
        assert_eq!(run.errors, 1);
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.completed_at, event.created_at);
        assert_eq!((run.completed_at - run.started_at).num_milliseconds(), 30_000);
    }

    #[test]
    fn malformed_metadata_yields_zero_counts() {
        let mut event = completed_at("run-2", 0, 1_000, json!("not an object"));
        let run = sync_run_from_event(&event);
        assert_eq!(run.signals_found, 0);
        assert_eq!(run.status, RunStatus::Failed);

        event.metadata = None;
        event.duration_ms = None;
        let run = sync_run_from_event(&event);
        assert_eq!(run.duration_ms, 0);
        assert_eq!(run.started_at, run.completed_at);
    }

    #[test]
    fn huge_duration_saturates_start_instead_of_panicking() {
        let event = completed_at("run-x", 0, i64::MAX, json!({}));
        let run = sync_run_from_event(&event);
        assert_eq!(run.duration_ms, i64::MAX);
        assert_eq!(run.started_at, chrono::DateTime::<chrono::Utc>::MIN_UTC);
        assert_eq!(run.completed_at, event.created_at);
    }

    #[test]
    fn status_success_when_signals_and_no_errors() {
        let event = completed_at("run-3", 0, 1_000, json!({"signals_found": 2, "errors": 0}));
        assert_eq!(sync_run_from_event(&event).status, RunStatus::Success);
    }

    #[test]
    fn aggregate_preserves_order_and_skips_other_states() {
        let events = vec![
            completed_at("newest", 50, 1_000, json!({})),
            event_at("noise", AgentState::Mining, "Mining source: X (chrome)", 40),
            completed_at("older", 10, 1_000, json!({})),
        ];
        let ids: Vec<String> = aggregate_runs(&events).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["newest", "older"]);
    }
}
