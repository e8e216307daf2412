//! URL outcome extraction: pairs each "reading" anchor with a terminal outcome.

use synclog_core::{
    AgentState, EventType, ProcessingEvent, SourceDetail, UrlOutcome, UrlResult, UNKNOWN_LABEL,
};

use crate::attribution::SourceAttribution;
use crate::correlate::first_after;
use crate::patterns::{self, SIGNAL_TOKEN, SKIPPED_TOKEN};

/// Extracts one [`UrlResult`] per `Reading content from: <url>` anchor that
/// reaches a terminal outcome within the slice.
///
/// Outcomes are searched independently per anchor in priority order: signal,
/// then skipped, then error. Matched events are not consumed, so one outcome
/// event can classify several anchors. Anchors with no outcome are dropped.
#[must_use]
pub fn extract_urls(
    events: &[ProcessingEvent],
    sources: &[SourceDetail],
    attribution: &dyn SourceAttribution,
) -> Vec<UrlResult> {
    let run_label = attribution.run_label(sources);

    events
        .iter()
        .enumerate()
        .filter(|(_, event)| event.agent_state == AgentState::Reading)
        .filter_map(|(idx, event)| {
            let url = patterns::parse_url_anchor(&event.message)?;
            let Some((outcome, duration_ms)) = classify(events, idx) else {
                tracing::trace!(url, anchor = %event.id, "url anchor has no outcome in window");
                return None;
            };
            Some(UrlResult {
                url: url.to_string(),
                outcome,
                duration_ms,
                source_label: attribution.label_for(event, &run_label),
            })
        })
        .collect()
}

fn classify(events: &[ProcessingEvent], anchor: usize) -> Option<(UrlOutcome, Option<i64>)> {
    if let Some(hit) = first_after(events, anchor, is_signal) {
        let outcome = UrlOutcome::Signal {
            score: patterns::parse_percent(&hit.message),
            category: hit
                .detail_str("category")
                .unwrap_or(UNKNOWN_LABEL)
                .to_string(),
        };
        return Some((outcome, hit.duration_ms));
    }

    if let Some(hit) = first_after(events, anchor, is_skipped) {
        let (score, reason) = patterns::parse_percent_reason(&hit.message)
            .map_or((0, None), |(score, reason)| (score, Some(reason.to_string())));
        return Some((UrlOutcome::Skipped { score, reason }, hit.duration_ms));
    }

    first_after(events, anchor, |e| e.event_type == EventType::Error).map(|hit| {
        (
            UrlOutcome::Error {
                reason: hit.message.clone(),
            },
            hit.duration_ms,
        )
    })
}

fn is_signal(event: &ProcessingEvent) -> bool {
    event.agent_state == AgentState::Signal && event.message.contains(SIGNAL_TOKEN)
}

fn is_skipped(event: &ProcessingEvent) -> bool {
    event.agent_state == AgentState::Skipped && event.message.contains(SKIPPED_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::FirstProductiveSource;
    use crate::testing::event_at;
    use serde_json::json;
    use synclog_core::SourceStatus;

    fn reading(id: &str, url: &str, offset: i64) -> ProcessingEvent {
        event_at(
            id,
            AgentState::Reading,
            &format!("Reading content from: {url}"),
            offset,
        )
    }

    fn source(label: &str, urls_found: u64) -> SourceDetail {
        SourceDetail {
            label: label.to_string(),
            browser: "chrome".to_string(),
            urls_found,
            duration_ms: 0,
            status: SourceStatus::Success,
        }
    }

    #[test]
    fn signal_reads_score_category_and_duration() {
        let mut signal = event_at("s", AgentState::Signal, "Found signal (92%)", 2);
        signal.details = Some(json!({"category": "Tech"}));
        signal.duration_ms = Some(850);
        let events = vec![reading("r", "http://a", 1), signal];

        let urls = extract_urls(&events, &[source("News", 1)], &FirstProductiveSource);
        assert_eq!(
            urls,
            vec![UrlResult {
                url: "http://a".to_string(),
                outcome: UrlOutcome::Signal {
                    score: 92,
                    category: "Tech".to_string(),
                },
                duration_ms: Some(850),
                source_label: "News".to_string(),
            }]
        );
    }

    #[test]
    fn signal_without_category_is_unknown() {
        let events = vec![
            reading("r", "http://a", 1),
            event_at("s", AgentState::Signal, "Found signal", 2),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(
            urls[0].outcome,
            UrlOutcome::Signal {
                score: 0,
                category: UNKNOWN_LABEL.to_string(),
            }
        );
        assert_eq!(urls[0].source_label, UNKNOWN_LABEL);
    }

    #[test]
    fn signal_takes_precedence_over_earlier_skip() {
        let events = vec![
            reading("r", "http://a", 1),
            event_at("k", AgentState::Skipped, "Irrelevant content (10%): ads", 2),
            event_at("s", AgentState::Signal, "Found signal (70%)", 3),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(urls[0].outcome.kind(), "signal");
        assert_eq!(urls[0].outcome.score(), Some(70));
    }

    #[test]
    fn skipped_reads_score_and_reason() {
        let events = vec![
            reading("r", "http://a", 1),
            event_at("k", AgentState::Skipped, "Irrelevant content (12%): off topic", 2),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(
            urls[0].outcome,
            UrlOutcome::Skipped {
                score: 12,
                reason: Some("off topic".to_string()),
            }
        );
    }

    #[test]
    fn skipped_without_template_has_defaults() {
        let events = vec![
            reading("r", "http://a", 1),
            event_at("k", AgentState::Skipped, "Irrelevant content", 2),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(
            urls[0].outcome,
            UrlOutcome::Skipped {
                score: 0,
                reason: None,
            }
        );
    }

    #[test]
    fn skip_takes_precedence_over_error() {
        let mut error = event_at("e", AgentState::Reading, "Timeout fetching page", 2);
        error.event_type = EventType::Error;
        let events = vec![
            reading("r", "http://a", 1),
            error,
            event_at("k", AgentState::Skipped, "Irrelevant content (5%): spam", 3),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(urls[0].outcome.kind(), "skipped");
    }

    #[test]
    fn error_reason_is_message() {
        let mut error = event_at(
            "e",
            AgentState::Other("Fetch".to_string()),
            "HTTP 503 from host",
            2,
        );
        error.event_type = EventType::Error;
        let events = vec![reading("r", "http://a", 1), error];

        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(
            urls[0].outcome,
            UrlOutcome::Error {
                reason: "HTTP 503 from host".to_string(),
            }
        );
    }

    #[test]
    fn anchor_without_outcome_is_dropped() {
        let events = vec![
            reading("r1", "http://a", 1),
            event_at("s", AgentState::Signal, "Found signal (50%)", 2),
            reading("r2", "http://b", 3),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].url, "http://a");
    }

    #[test]
    fn outcome_events_are_shared_between_anchors() {
        let events = vec![
            reading("r1", "http://a", 1),
            reading("r2", "http://b", 2),
            event_at("s", AgentState::Signal, "Found signal (80%)", 3),
        ];
        let urls = extract_urls(&events, &[], &FirstProductiveSource);
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|u| u.outcome.score() == Some(80)));
    }

    #[test]
    fn signal_state_without_token_is_not_a_signal() {
        let events = vec![
            reading("r", "http://a", 1),
            event_at("s", AgentState::Signal, "Scoring content", 2),
        ];
        assert!(extract_urls(&events, &[], &FirstProductiveSource).is_empty());
    }

    #[test]
    fn every_url_gets_the_single_productive_source() {
        let events = vec![
            reading("r1", "http://a", 1),
            reading("r2", "http://b", 2),
            event_at("s", AgentState::Signal, "Found signal (80%)", 3),
        ];
        let sources = vec![source("Quiet", 0), source("Loud", 2)];
        let urls = extract_urls(&events, &sources, &FirstProductiveSource);
        assert!(urls.iter().all(|u| u.source_label == "Loud"));
    }
}
