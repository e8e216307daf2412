//! `runs` and `show` command handlers.

use serde_json::json;
use synclog_core::{RunHierarchy, SourceStatus, SyncRun, UrlOutcome, UrlResult};
use synclog_engine::{find_run, list_runs, PgEventLog, Reconstructor};

/// Print a table of the user's newest runs.
///
/// # Errors
///
/// Returns an error if the event store query fails.
pub(crate) async fn run_list(pool: sqlx::PgPool, user: &str, limit: u32) -> anyhow::Result<()> {
    let log = PgEventLog::new(pool);
    let runs = list_runs(&log, user, limit).await?;

    if runs.is_empty() {
        println!("no completed runs found for user {user}");
        return Ok(());
    }

    print!("{}", render_run_table(&runs));
    Ok(())
}

/// Reconstruct one run and print it as a tree or as JSON.
///
/// # Errors
///
/// Returns an error if the run does not exist for `user` or the event store
/// query fails.
pub(crate) async fn run_show(
    pool: sqlx::PgPool,
    user: &str,
    run_id: &str,
    source: Option<&str>,
    as_json: bool,
) -> anyhow::Result<()> {
    let log = PgEventLog::new(pool);
    let run = find_run(&log, user, run_id).await?;
    let mut hierarchy = Reconstructor::default().load(&log, &run).await?;
    if let Some(label) = source {
        hierarchy = hierarchy.filtered_to_source(label);
    }

    if as_json {
        let body = json!({
            "run": run,
            "sources": hierarchy.sources,
            "urls": hierarchy.urls,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        print!("{}", render_hierarchy(&run, &hierarchy));
    }
    Ok(())
}

pub(crate) fn render_run_table(runs: &[SyncRun]) -> String {
    let header = format!(
        "{:<38}{:<22}{:<9}{:>9}{:>8}{:>9}{:>8}{:>10}",
        "RUN", "COMPLETED", "STATUS", "SIGNALS", "URLS", "SKIPPED", "ERRORS", "SECONDS"
    );
    let rows = runs.iter().map(|run| {
        format!(
            "{:<38}{:<22}{:<9}{:>9}{:>8}{:>9}{:>8}{:>10.1}",
            run.id,
            run.completed_at.format("%Y-%m-%d %H:%M:%S"),
            run.status.to_string(),
            run.signals_found,
            run.urls_processed,
            run.skipped,
            run.errors,
            seconds(run.duration_ms),
        )
    });
    join_lines(std::iter::once(header).chain(rows))
}

/// Render a run as an indented source -> URL tree.
///
/// Sources sharing a label are listed once per anchor, but their URLs are
/// printed only under the first.
pub(crate) fn render_hierarchy(run: &SyncRun, hierarchy: &RunHierarchy) -> String {
    let mut lines = vec![format!(
        "run {} ({}) {} signals, {} urls, {} skipped, {} errors, {:.1}s",
        run.id,
        run.status,
        run.signals_found,
        run.urls_processed,
        run.skipped,
        run.errors,
        seconds(run.duration_ms),
    )];

    if hierarchy.is_empty() {
        lines.push("  (no source or url activity in window)".to_string());
        return join_lines(lines);
    }

    let mut printed: Vec<&str> = Vec::new();
    for source in &hierarchy.sources {
        lines.push(format!(
            "  {} [{}] {} urls found, {:.1}s, {}",
            source.label,
            source.browser,
            source.urls_found,
            seconds(source.duration_ms),
            match source.status {
                SourceStatus::Success => "ok",
                SourceStatus::Error => "error",
            },
        ));
        if printed.contains(&source.label.as_str()) {
            continue;
        }
        printed.push(source.label.as_str());
        lines.extend(hierarchy.urls_for_source(&source.label).map(url_line));
    }

    let mut orphans = hierarchy
        .urls
        .iter()
        .filter(|u| !printed.contains(&u.source_label.as_str()))
        .peekable();
    if orphans.peek().is_some() {
        lines.push("  (unattributed)".to_string());
        lines.extend(orphans.map(url_line));
    }
    join_lines(lines)
}

fn url_line(url: &UrlResult) -> String {
    format!("    {} {}", url.url, describe(&url.outcome))
}

/// Newline-terminated concatenation of `lines`.
fn join_lines(lines: impl IntoIterator<Item = String>) -> String {
    lines.into_iter().fold(String::new(), |mut out, line| {
        out.push_str(&line);
        out.push('\n');
        out
    })
}

fn describe(outcome: &UrlOutcome) -> String {
    match outcome {
        UrlOutcome::Signal { score, category } => format!("signal {score}% {category}"),
        UrlOutcome::Skipped {
            score,
            reason: Some(reason),
        } => format!("skipped {score}% ({reason})"),
        UrlOutcome::Skipped { score, reason: None } => format!("skipped {score}%"),
        UrlOutcome::Error { reason } => format!("error: {reason}"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn seconds(duration_ms: i64) -> f64 {
    duration_ms as f64 / 1_000.0
}
