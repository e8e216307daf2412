//! Source extraction: pairs each "source started" anchor with its "found" report.

use synclog_core::{AgentState, EventType, ProcessingEvent, SourceDetail, SourceStatus};

use crate::correlate::first_after;
use crate::patterns::{self, SOURCE_FINISHED_TOKEN};

/// Extracts one [`SourceDetail`] per `Mining source: <label> (<browser>)` anchor.
///
/// The finish event is the first strictly-later `Mining` event whose message
/// mentions both `Found` and the anchor's label. This is a substring match,
/// so a label that is a substring of another source's label can pair with
/// that source's report. An anchor without a finish still yields a source
/// with zero URLs and zero duration.
///
/// Status is taken from the anchor event's type, not the finish event's.
#[must_use]
pub fn extract_sources(events: &[ProcessingEvent]) -> Vec<SourceDetail> {
    events
        .iter()
        .enumerate()
        .filter(|(_, event)| event.agent_state == AgentState::Mining)
        .filter_map(|(idx, event)| {
            let anchor = patterns::parse_source_anchor(&event.message)?;
            let finish = first_after(events, idx, |candidate| {
                candidate.agent_state == AgentState::Mining
                    && candidate.message.contains(SOURCE_FINISHED_TOKEN)
                    && candidate.message.contains(anchor.label)
            });

            Some(SourceDetail {
                label: anchor.label.to_string(),
                browser: anchor.browser.to_string(),
                urls_found: finish.map_or(0, |f| patterns::parse_url_count(&f.message)),
                duration_ms: finish.map_or(0, ProcessingEvent::duration_or_zero),
                status: if event.event_type == EventType::Error {
                    SourceStatus::Error
                } else {
                    SourceStatus::Success
                },
            })
        })
        .collect()
}
