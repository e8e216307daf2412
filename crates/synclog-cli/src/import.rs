//! `import` command: load newline-delimited processing events into the store.

use std::path::Path;

use anyhow::Context;
use synclog_core::ProcessingEvent;

/// Read `file` and append every event to `processing_events`.
///
/// Events whose id already exists are skipped.
///
/// # Errors
///
/// Returns an error if the file cannot be read, any line is not a valid
/// event, or the insert transaction fails. Nothing is written on error.
pub(crate) async fn run_import(pool: &sqlx::PgPool, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let events = parse_events(&raw)?;

    let inserted = synclog_db::insert_processing_events(pool, &events).await?;
    tracing::info!(
        file = %file.display(),
        parsed = events.len(),
        inserted,
        "imported processing events"
    );
    println!(
        "imported {inserted} of {} event(s) from {}",
        events.len(),
        file.display()
    );
    Ok(())
}

/// Parse JSON Lines input. Blank lines are ignored.
pub(crate) fn parse_events(raw: &str) -> anyhow::Result<Vec<ProcessingEvent>> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<ProcessingEvent>(line)
                .with_context(|| format!("line {}: invalid processing event", idx + 1))
        })
        .collect()
}
