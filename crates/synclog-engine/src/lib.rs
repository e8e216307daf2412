//! Reconstructs the source/URL hierarchy of a sync run from the flat
//! processing log.
//!
//! A run is identified by its `Completed` event; its window is
//! `[completed_at - duration, completed_at]`. Sources and URL outcomes are
//! recovered from that window's messages by anchor-and-follower matching.

pub mod attribution;
mod correlate;
pub mod error;
pub mod memory;
pub mod patterns;
pub mod reconstruct;
pub mod runs;
pub mod session;
pub mod sources;
pub mod store;
pub mod urls;
pub mod window;

#[cfg(test)]
mod testing;

pub use attribution::{FirstProductiveSource, SourceAttribution, TaggedSourceAttribution};
pub use error::{ReconstructError, StoreError};
pub use memory::MemoryEventLog;
pub use reconstruct::{reconstruct, Reconstructor};
pub use runs::{aggregate_runs, find_run, list_runs, sync_run_from_event};
pub use session::{Selection, SessionLimits, SessionRegistry, ViewSession};
pub use sources::extract_sources;
pub use store::{EventLog, PgEventLog};
pub use urls::extract_urls;
pub use window::{fetch_window, RunWindow};
