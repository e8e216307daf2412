//! The raw telemetry record emitted by the mining process.
//!
//! Events are immutable once written. The `event_type` and `agent_state`
//! vocabularies are owned by the producer and grow over time, so both are
//! modelled as known tags with an opaque fallback rather than closed enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse category of a processing event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    Info,
    Analysis,
    Action,
    Error,
    System,
    Other(String),
}

impl EventType {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            EventType::Info => "info",
            EventType::Analysis => "analysis",
            EventType::Action => "action",
            EventType::Error => "error",
            EventType::System => "system",
            EventType::Other(raw) => raw,
        }
    }
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        match raw {
            "info" => EventType::Info,
            "analysis" => EventType::Analysis,
            "action" => EventType::Action,
            "error" => EventType::Error,
            "system" => EventType::System,
            other => EventType::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(raw: String) -> Self {
        EventType::from(raw.as_str())
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label naming the producer phase that emitted an event.
///
/// Only the tags the reconstruction engine correlates on get their own
/// variant. Anything else is carried through untouched as [`AgentState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentState {
    Mining,
    Reading,
    Signal,
    Skipped,
    Completed,
    Other(String),
}

impl AgentState {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            AgentState::Mining => "Mining",
            AgentState::Reading => "Reading",
            AgentState::Signal => "Signal",
            AgentState::Skipped => "Skipped",
            AgentState::Completed => "Completed",
            AgentState::Other(raw) => raw,
        }
    }
}

impl From<&str> for AgentState {
    fn from(raw: &str) -> Self {
        match raw {
            "Mining" => AgentState::Mining,
            "Reading" => AgentState::Reading,
            "Signal" => AgentState::Signal,
            "Skipped" => AgentState::Skipped,
            "Completed" => AgentState::Completed,
            other => AgentState::Other(other.to_string()),
        }
    }
}

impl From<String> for AgentState {
    fn from(raw: String) -> Self {
        AgentState::from(raw.as_str())
    }
}

impl From<AgentState> for String {
    fn from(value: AgentState) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parses a stored level. Unknown levels are treated as absent.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// One entry of the append-only processing log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEvent {
    pub id: String,
    pub user_id: String,
    pub event_type: EventType,
    pub agent_state: AgentState,
    /// Free text. URLs, labels, counts and percentages are embedded here.
    pub message: String,
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

impl ProcessingEvent {
    /// Reads a non-negative integer counter from `metadata`.
    ///
    /// Absent keys, negative numbers, and non-numeric values all read as 0.
    /// Numeric strings (`"12"`) are accepted since some producers stringify counters.
    #[must_use]
    pub fn metadata_count(&self, key: &str) -> u64 {
        let Some(value) = self.metadata.as_ref().and_then(|m| m.get(key)) else {
            return 0;
        };
        value
            .as_u64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<u64>().ok()))
            .unwrap_or(0)
    }

    /// Reads a string field from `details`, if present and non-empty.
    #[must_use]
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Reads a string field from `metadata`, if present and non-empty.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Elapsed milliseconds, with a missing or negative duration read as 0.
    #[must_use]
    pub fn duration_or_zero(&self) -> i64 {
        self.duration_ms.unwrap_or(0).max(0)
    }
}
