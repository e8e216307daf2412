//! Event builders shared by the unit tests.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use synclog_core::{AgentState, EventType, ProcessingEvent};

pub(crate) const USER: &str = "user-1";

pub(crate) fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(crate) fn event_at(
    id: &str,
    agent_state: AgentState,
    message: &str,
    offset_secs: i64,
) -> ProcessingEvent {
    ProcessingEvent {
        id: id.to_string(),
        user_id: USER.to_string(),
        event_type: EventType::Info,
        agent_state,
        message: message.to_string(),
        level: None,
        duration_ms: None,
        details: None,
        metadata: None,
        created_at: base_time() + Duration::seconds(offset_secs),
    }
}

pub(crate) fn completed_at(
    id: &str,
    offset_secs: i64,
    duration_ms: i64,
    metadata: Value,
) -> ProcessingEvent {
    ProcessingEvent {
        event_type: EventType::System,
        duration_ms: Some(duration_ms),
        metadata: Some(metadata),
        ..event_at(id, AgentState::Completed, "Mining complete", offset_secs)
    }
}
