//! Assigning URL outcomes to sources.
//!
//! The log has no per-URL source link, so attribution is a heuristic. It sits
//! behind [`SourceAttribution`] so a producer-supplied tag can replace it
//! without touching extraction.

use synclog_core::{ProcessingEvent, SourceDetail, UNKNOWN_LABEL};

/// Metadata key a producer may set on a `Reading` event to name its source.
pub const SOURCE_TAG_KEY: &str = "source_label";

pub trait SourceAttribution: Send + Sync {
    /// Label applied to every URL of a run, computed once per run.
    fn run_label(&self, sources: &[SourceDetail]) -> String;

    /// Label for the URL read by `anchor`. Defaults to the run label.
    fn label_for(&self, anchor: &ProcessingEvent, run_label: &str) -> String {
        let _ = anchor;
        run_label.to_string()
    }
}

/// Attributes every URL to the first source that reported any URLs.
///
/// With no productive source, falls back to the first source, then to
/// `"Unknown"`. Runs that mined several productive sources are attributed
/// entirely to the first of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstProductiveSource;

impl SourceAttribution for FirstProductiveSource {
    fn run_label(&self, sources: &[SourceDetail]) -> String {
        sources
            .iter()
            .find(|s| s.urls_found > 0)
            .or_else(|| sources.first())
            .map_or_else(|| UNKNOWN_LABEL.to_string(), |s| s.label.clone())
    }
}

/// Honours an explicit `metadata.source_label` on the URL anchor and falls
/// back to `inner` when the producer did not tag it.
#[derive(Debug, Clone, Default)]
pub struct TaggedSourceAttribution<A = FirstProductiveSource> {
    inner: A,
}

impl<A: SourceAttribution> TaggedSourceAttribution<A> {
    pub fn new(inner: A) -> Self {
        Self { inner }
    }
}

impl<A: SourceAttribution> SourceAttribution for TaggedSourceAttribution<A> {
    fn run_label(&self, sources: &[SourceDetail]) -> String {
        self.inner.run_label(sources)
    }

    fn label_for(&self, anchor: &ProcessingEvent, run_label: &str) -> String {
        anchor
            .metadata_str(SOURCE_TAG_KEY)
            .map_or_else(|| self.inner.label_for(anchor, run_label), str::to_string)
    }
}
