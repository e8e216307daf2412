pub mod app_config;
pub mod config;
pub mod events;
pub mod hierarchy;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use events::{AgentState, EventType, LogLevel, ProcessingEvent};
pub use hierarchy::{
    RunHierarchy, RunStatus, SourceDetail, SourceStatus, SyncRun, UrlOutcome, UrlResult,
    UNKNOWN_LABEL,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
