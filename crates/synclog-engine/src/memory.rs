//! In-memory [`EventLog`] for tests and fixture replay.
//!
//! Events live in a single append-only arena kept sorted by `(created_at, id)`,
//! the same order the postgres queries use.
//! Window queries resolve to an index range by binary search and copy that
//! range out; nothing in the arena is ever modified after insertion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use synclog_core::{AgentState, ProcessingEvent};

use crate::error::StoreError;
use crate::store::EventLog;

#[derive(Default)]
pub struct MemoryEventLog {
    events: RwLock<Vec<ProcessingEvent>>,
    unavailable: AtomicBool,
}

impl MemoryEventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from events in any order.
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = ProcessingEvent>) -> Self {
        let log = Self::new();
        for event in events {
            log.append(event);
        }
        log
    }

    /// Appends an event. Events with equal timestamps are ordered by id.
    pub fn append(&self, event: ProcessingEvent) {
        let mut events = self.events.write().unwrap_or_else(PoisonError::into_inner);
        let at = events.partition_point(|e| {
            (e.created_at, e.id.as_str()) <= (event.created_at, event.id.as_str())
        });
        events.insert(at, event);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// While set, every query fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory log marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for MemoryEventLog {
    async fn list_completed_runs(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<ProcessingEvent>, StoreError> {
        self.check_available()?;
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        Ok(events
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id && e.agent_state == AgentState::Completed)
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn get_completed_run(
        &self,
        user_id: &str,
        run_id: &str,
    ) -> Result<Option<ProcessingEvent>, StoreError> {
        self.check_available()?;
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        Ok(events
            .iter()
            .find(|e| {
                e.id == run_id && e.user_id == user_id && e.agent_state == AgentState::Completed
            })
            .cloned())
    }

    async fn list_events_in_window(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessingEvent>, StoreError> {
        self.check_available()?;
        let events = self.events.read().unwrap_or_else(PoisonError::into_inner);
        let lo = events.partition_point(|e| e.created_at < start);
        let hi = events.partition_point(|e| e.created_at <= end);
        Ok(events
            .get(lo..hi)
            .unwrap_or_default()
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
