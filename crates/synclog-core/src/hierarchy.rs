//! Derived, in-memory views over the processing log: run → source → URL.
//!
//! Nothing here is ever persisted. Every value is recomputed from an event
//! slice when a run is selected.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Label used when no better attribution or category is available.
pub const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    /// Any error makes a run partial; otherwise finding a signal makes it a success.
    #[must_use]
    pub fn classify(signals_found: u64, errors: u64) -> Self {
        if errors > 0 {
            RunStatus::Partial
        } else if signals_found > 0 {
            RunStatus::Success
        } else {
            RunStatus::Failed
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::Partial => write!(f, "partial"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Summary of one completed sync run, taken from its completion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    /// Id of the `Completed` event this run was derived from.
    pub id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
    pub signals_found: u64,
    pub urls_processed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub status: RunStatus,
}

impl SyncRun {
    /// Inclusive `[started_at, completed_at]` bounds of the run window.
    #[must_use]
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.started_at, self.completed_at)
    }

    /// `completed_at - duration_ms`, saturating at the earliest representable
    /// instant. Negative durations count as zero.
    #[must_use]
    pub fn started_at_for(completed_at: DateTime<Utc>, duration_ms: i64) -> DateTime<Utc> {
        Duration::try_milliseconds(duration_ms.max(0))
            .and_then(|elapsed| completed_at.checked_sub_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Success,
    Error,
}

/// One source mined during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDetail {
    pub label: String,
    pub browser: String,
    pub urls_found: u64,
    pub duration_ms: i64,
    pub status: SourceStatus,
}

/// Terminal classification of a read URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum UrlOutcome {
    Signal {
        score: u32,
        category: String,
    },
    Skipped {
        score: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    Error {
        reason: String,
    },
}

impl UrlOutcome {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            UrlOutcome::Signal { .. } => "signal",
            UrlOutcome::Skipped { .. } => "skipped",
            UrlOutcome::Error { .. } => "error",
        }
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        match self {
            UrlOutcome::Signal { score, .. } | UrlOutcome::Skipped { score, .. } => Some(*score),
            UrlOutcome::Error { .. } => None,
        }
    }
}

/// Outcome of one URL read during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlResult {
    pub url: String,
    #[serde(flatten)]
    pub outcome: UrlOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<i64>,
    /// Assigned heuristically; the log carries no source-to-URL link.
    pub source_label: String,
}

/// Reconstructed detail for one selected run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHierarchy {
    pub run_id: String,
    pub sources: Vec<SourceDetail>,
    pub urls: Vec<UrlResult>,
}

impl RunHierarchy {
    /// URLs attributed to `label`, for drill-down into a single source.
    pub fn urls_for_source<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a UrlResult> {
        self.urls.iter().filter(move |u| u.source_label == label)
    }

    /// A copy of this hierarchy with `urls` narrowed to one source.
    #[must_use]
    pub fn filtered_to_source(&self, label: &str) -> Self {
        Self {
            run_id: self.run_id.clone(),
            sources: self.sources.clone(),
            urls: self.urls_for_source(label).cloned().collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.urls.is_empty()
    }
}
