//! Forward correlation over a time-ordered event slice.

use synclog_core::ProcessingEvent;

/// First event after `events[anchor]` that is strictly later in time and
/// satisfies `predicate`.
///
/// Matches are never consumed: two anchors may resolve to the same event.
/// Events sharing the anchor's timestamp are never candidates.
pub(crate) fn first_after<'a, P>(
    events: &'a [ProcessingEvent],
    anchor: usize,
    predicate: P,
) -> Option<&'a ProcessingEvent>
where
    P: Fn(&ProcessingEvent) -> bool,
{
    let anchored_at = events.get(anchor)?.created_at;
    events
        .get(anchor + 1..)?
        .iter()
        .find(|candidate| candidate.created_at > anchored_at && predicate(candidate))
}
