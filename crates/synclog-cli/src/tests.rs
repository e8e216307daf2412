use super::*;
use chrono::{TimeZone, Utc};
use synclog_core::{
    AgentState, RunHierarchy, RunStatus, SourceDetail, SourceStatus, SyncRun, UrlOutcome, UrlResult,
};

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["synclog-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["synclog-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["synclog-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn runs_requires_user() {
    assert!(Cli::try_parse_from(["synclog-cli", "runs"]).is_err());
}

#[test]
fn parses_runs_with_limit() {
    let cli = Cli::try_parse_from(["synclog-cli", "runs", "--user", "u1", "--limit", "5"])
        .expect("expected valid cli args");
    match cli.command {
        Some(Commands::Runs { user, limit }) => {
            assert_eq!(user, "u1");
            assert_eq!(limit, Some(5));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_show_with_source_and_json() {
    let cli = Cli::try_parse_from([
        "synclog-cli",
        "show",
        "--user",
        "u1",
        "run-9",
        "--source",
        "NewsSite",
        "--json",
    ])
    .expect("expected valid cli args");
    match cli.command {
        Some(Commands::Show {
            user,
            run_id,
            source,
            json,
        }) => {
            assert_eq!(user, "u1");
            assert_eq!(run_id, "run-9");
            assert_eq!(source.as_deref(), Some("NewsSite"));
            assert!(json);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_import_path() {
    let cli = Cli::try_parse_from(["synclog-cli", "import", "fixtures/run.jsonl"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Import { ref file }) if file.ends_with("run.jsonl")
    ));
}

#[test]
fn parse_events_skips_blank_lines() {
    let raw = r#"{"id":"e1","user_id":"u1","event_type":"info","agent_state":"Mining","message":"Mining source: A (chrome)","created_at":"2024-05-01T12:00:00Z"}

{"id":"e2","user_id":"u1","event_type":"system","agent_state":"Completed","message":"done","duration_ms":500,"metadata":{"signals_found":2},"created_at":"2024-05-01T12:00:05Z"}
"#;
    let events = import::parse_events(raw).expect("valid jsonl");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].agent_state, AgentState::Mining);
    assert_eq!(events[1].duration_ms, Some(500));
    assert_eq!(events[1].metadata_count("signals_found"), 2);
}

#[test]
fn parse_events_reports_line_number() {
    let raw = "{\"id\":\"e1\"}\n";
    let err = import::parse_events(raw).expect_err("missing fields");
    assert!(err.to_string().contains("line 1"));
}

fn sample_run() -> SyncRun {
    let completed_at = Utc
        .with_ymd_and_hms(2024, 5, 1, 12, 0, 10)
        .single()
        .expect("valid timestamp");
    SyncRun {
        id: "run-1".to_string(),
        user_id: "u1".to_string(),
        started_at: SyncRun::started_at_for(completed_at, 10_000),
        completed_at,
        duration_ms: 10_000,
        signals_found: 1,
        urls_processed: 2,
        skipped: 1,
        errors: 0,
        status: RunStatus::Success,
    }
}

#[test]
fn run_table_has_header_and_row() {
    let table = runs::render_run_table(&[sample_run()]);
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("RUN"));
    assert!(lines[1].starts_with("run-1"));
    assert!(lines[1].contains("success"));
    assert!(lines[1].contains("10.0"));
}

#[test]
fn hierarchy_tree_nests_urls_under_sources() {
    let hierarchy = RunHierarchy {
        run_id: "run-1".to_string(),
        sources: vec![SourceDetail {
            label: "NewsSite".to_string(),
            browser: "chrome".to_string(),
            urls_found: 2,
            duration_ms: 3_000,
            status: SourceStatus::Success,
        }],
        urls: vec![
            UrlResult {
                url: "http://a".to_string(),
                outcome: UrlOutcome::Signal {
                    score: 92,
                    category: "Tech".to_string(),
                },
                duration_ms: None,
                source_label: "NewsSite".to_string(),
            },
            UrlResult {
                url: "http://b".to_string(),
                outcome: UrlOutcome::Skipped {
                    score: 4,
                    reason: Some("thin".to_string()),
                },
                duration_ms: None,
                source_label: "Unknown".to_string(),
            },
        ],
    };

    let tree = runs::render_hierarchy(&sample_run(), &hierarchy);
    assert!(tree.contains("  NewsSite [chrome] 2 urls found, 3.0s, ok"));
    assert!(tree.contains("    http://a signal 92% Tech"));
    assert!(tree.contains("  (unattributed)\n    http://b skipped 4% (thin)"));
}

#[test]
fn empty_hierarchy_says_so() {
    let hierarchy = RunHierarchy {
        run_id: "run-1".to_string(),
        sources: Vec::new(),
        urls: Vec::new(),
    };
    let tree = runs::render_hierarchy(&sample_run(), &hierarchy);
    assert!(tree.contains("no source or url activity"));
}

#[test]
fn repeated_source_label_lists_urls_once() {
    let anchor = |duration_ms| SourceDetail {
        label: "NewsSite".to_string(),
        browser: "chrome".to_string(),
        urls_found: 1,
        duration_ms,
        status: SourceStatus::Success,
    };
    let hierarchy = RunHierarchy {
        run_id: "run-1".to_string(),
        sources: vec![anchor(1_000), anchor(2_000)],
        urls: vec![UrlResult {
            url: "http://a".to_string(),
            outcome: UrlOutcome::Error {
                reason: "Fetch failed".to_string(),
            },
            duration_ms: None,
            source_label: "NewsSite".to_string(),
        }],
    };

    let tree = runs::render_hierarchy(&sample_run(), &hierarchy);
    let lines: Vec<&str> = tree.lines().collect();
    assert_eq!(
        lines[1..],
        [
            "  NewsSite [chrome] 1 urls found, 1.0s, ok",
            "    http://a error: Fetch failed",
            "  NewsSite [chrome] 1 urls found, 2.0s, ok",
        ]
    );
    assert!(tree.ends_with('\n'));
    assert!(!tree.contains("(unattributed)"));
}

#[test]
fn run_table_rows_are_newline_terminated() {
    let table = runs::render_run_table(&[sample_run(), sample_run()]);
    assert_eq!(table.matches('\n').count(), 3);
    assert!(table.ends_with('\n'));
}
