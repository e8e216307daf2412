use thiserror::Error;

/// Failure reading from the event log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] synclog_db::DbError),

    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// Failure producing a run list or a run hierarchy.
///
/// Only store-level problems surface here. Events that fail to match a
/// template are absorbed by the extractors as defaults or dropped anchors.
#[derive(Debug, Error)]
pub enum ReconstructError {
    #[error("run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error("events for run '{run_id}' are unavailable: {source}")]
    Unavailable {
        run_id: String,
        #[source]
        source: StoreError,
    },

    #[error("runs for user '{user_id}' are unavailable: {source}")]
    RunsUnavailable {
        user_id: String,
        #[source]
        source: StoreError,
    },
}

impl ReconstructError {
    /// True when the store, not the request, is at fault.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ReconstructError::Unavailable { .. } | ReconstructError::RunsUnavailable { .. }
        )
    }
}
