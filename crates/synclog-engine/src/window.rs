//! Resolves a run to the slice of the log that belongs to it.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use synclog_core::{ProcessingEvent, SyncRun};

use crate::error::ReconstructError;
use crate::store::EventLog;

/// Inclusive `[start, end]` bounds of one run, scoped to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunWindow {
    pub user_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RunWindow {
    #[must_use]
    pub fn for_run(run: &SyncRun) -> Self {
        let (start, end) = run.window();
        Self {
            user_id: run.user_id.clone(),
            start,
            end,
        }
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Fetches the ordered event slice for `run`.
///
/// The slice may be empty when the store has pruned old events.
///
/// # Errors
///
/// Returns [`ReconstructError::Unavailable`] if the store query fails.
pub async fn fetch_window(
    log: &dyn EventLog,
    run: &SyncRun,
) -> Result<Vec<ProcessingEvent>, ReconstructError> {
    let window = RunWindow::for_run(run);
    let mut events = log
        .list_events_in_window(&window.user_id, window.start, window.end)
        .await
        .map_err(|source| {
            tracing::warn!(run_id = %run.id, error = %source, "run window fetch failed");
            ReconstructError::Unavailable {
                run_id: run.id.clone(),
                source,
            }
        })?;

    // Correlation assumes the store order: ascending `created_at`, ties by id.
    if !events.is_sorted_by(|a, b| log_order(a, b).is_le()) {
        tracing::warn!(run_id = %run.id, "event store returned an unordered window; sorting");
        events.sort_by(log_order);
    }

    tracing::debug!(
        run_id = %run.id,
        events = events.len(),
        start = %window.start,
        end = %window.end,
        "fetched run window"
    );
    Ok(events)
}

fn log_order(a: &ProcessingEvent, b: &ProcessingEvent) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::MemoryEventLog;
    use crate::reconstruct::Reconstructor;
    use crate::runs::sync_run_from_event;
    use crate::testing::{completed_at, event_at};
    use async_trait::async_trait;
    use serde_json::json;
    use synclog_core::{AgentState, UrlOutcome};

    /// Serves windows from `inner` newest first, as a misbehaving store would.
    struct ReversedLog {
        inner: MemoryEventLog,
    }

    #[async_trait]
    impl EventLog for ReversedLog {
        async fn list_completed_runs(
            &self,
            user_id: &str,
            limit: u32,
        ) -> Result<Vec<ProcessingEvent>, StoreError> {
            self.inner.list_completed_runs(user_id, limit).await
        }

        async fn get_completed_run(
            &self,
            user_id: &str,
            run_id: &str,
        ) -> Result<Option<ProcessingEvent>, StoreError> {
            self.inner.get_completed_run(user_id, run_id).await
        }

        async fn list_events_in_window(
            &self,
            user_id: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<ProcessingEvent>, StoreError> {
            let mut events = self
                .inner
                .list_events_in_window(user_id, start, end)
                .await?;
            events.reverse();
            Ok(events)
        }
    }

    fn news_site_events() -> Vec<ProcessingEvent> {
        let mut signal = event_at("e3", AgentState::Signal, "Found signal (92%)", 2);
        signal.details = Some(json!({"category": "Tech"}));
        vec![
            event_at("e1", AgentState::Mining, "Mining source: NewsSite (chrome)", 0),
            event_at("e2a", AgentState::Reading, "Reading content from: http://a", 1),
            event_at("e2b", AgentState::Reading, "Reading content from: http://b", 1),
            signal,
            event_at("e4", AgentState::Mining, "Mining: Found 2 URLs (NewsSite)", 3),
            completed_at("run-1", 10, 10_000, json!({"signals_found": 1})),
        ]
    }

    #[test]
    fn window_spans_duration_before_completion() {
        let run = sync_run_from_event(&completed_at("run-1", 60, 30_000, json!({})));
        let window = RunWindow::for_run(&run);

        assert_eq!((window.end - window.start).num_seconds(), 30);
        assert!(window.contains(window.start));
        assert!(window.contains(window.end));
        assert!(!window.contains(window.end + chrono::Duration::milliseconds(1)));
    }

    #[tokio::test]
    async fn fetch_returns_only_in_window_events() {
        let completion = completed_at("run-1", 60, 30_000, json!({}));
        let log = MemoryEventLog::from_events([
            event_at("before", AgentState::Mining, "m", 29),
            event_at("first", AgentState::Mining, "m", 30),
            event_at("inside", AgentState::Reading, "r", 45),
            completion.clone(),
            event_at("after", AgentState::Mining, "m", 61),
        ]);
        let run = sync_run_from_event(&completion);

        let events = fetch_window(&log, &run).await.expect("window");
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "inside", "run-1"]);
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_as_unavailable() {
        let completion = completed_at("run-1", 60, 30_000, json!({}));
        let log = MemoryEventLog::from_events([completion.clone()]);
        log.set_unavailable(true);
        let run = sync_run_from_event(&completion);

        let err = fetch_window(&log, &run).await.expect_err("store is down");
        assert!(err.is_unavailable());
        assert!(matches!(err, ReconstructError::Unavailable { ref run_id, .. } if run_id == "run-1"));
    }

    #[tokio::test]
    async fn unordered_window_is_sorted_before_correlation() {
        let ordered = MemoryEventLog::from_events(news_site_events());
        let reversed = ReversedLog {
            inner: MemoryEventLog::from_events(news_site_events()),
        };
        let completion = completed_at("run-1", 10, 10_000, json!({"signals_found": 1}));
        let run = sync_run_from_event(&completion);

        let events = fetch_window(&reversed, &run).await.expect("window");
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2a", "e2b", "e3", "e4", "run-1"]);

        let reconstructor = Reconstructor::default();
        let expected = reconstructor.load(&ordered, &run).await.expect("ordered");
        let recovered = reconstructor.load(&reversed, &run).await.expect("reversed");
        assert_eq!(recovered, expected);
        assert_eq!(recovered.sources.len(), 1);
        assert_eq!(recovered.sources[0].label, "NewsSite");
        let b = recovered
            .urls
            .iter()
            .find(|u| u.url == "http://b")
            .expect("http://b classified");
        assert!(matches!(b.outcome, UrlOutcome::Signal { score: 92, .. }));
    }
}
