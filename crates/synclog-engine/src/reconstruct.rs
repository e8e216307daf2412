use std::sync::Arc;

use synclog_core::{ProcessingEvent, RunHierarchy, SyncRun};

use crate::attribution::{FirstProductiveSource, SourceAttribution};
use crate::error::ReconstructError;
use crate::sources::extract_sources;
use crate::store::EventLog;
use crate::urls::extract_urls;
use crate::window::fetch_window;

/// Builds a [`RunHierarchy`] from a run's event slice.
///
/// Reconstruction is a pure function of the slice: the same events always
/// produce the same hierarchy.
#[derive(Clone)]
pub struct Reconstructor {
    attribution: Arc<dyn SourceAttribution>,
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::new(FirstProductiveSource)
    }
}

impl Reconstructor {
    pub fn new(attribution: impl SourceAttribution + 'static) -> Self {
        Self {
            attribution: Arc::new(attribution),
        }
    }

    #[must_use]
    pub fn reconstruct(&self, run_id: &str, events: &[ProcessingEvent]) -> RunHierarchy {
        let sources = extract_sources(events);
        let urls = extract_urls(events, &sources, self.attribution.as_ref());

        tracing::debug!(
            run_id,
            events = events.len(),
            sources = sources.len(),
            urls = urls.len(),
            "reconstructed run hierarchy"
        );

        RunHierarchy {
            run_id: run_id.to_string(),
            sources,
            urls,
        }
    }

    /// Fetches `run`'s window and reconstructs it.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::Unavailable`] if the window cannot be fetched.
    pub async fn load(
        &self,
        log: &dyn EventLog,
        run: &SyncRun,
    ) -> Result<RunHierarchy, ReconstructError> {
        let events = fetch_window(log, run).await?;
        Ok(self.reconstruct(&run.id, &events))
    }
}

/// Reconstructs with the default attribution heuristic.
#[must_use]
pub fn reconstruct(run_id: &str, events: &[ProcessingEvent]) -> RunHierarchy {
    Reconstructor::default().reconstruct(run_id, events)
}
