//! Terminal and JSON rendering shared by `run` and `replay`.

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;
use testlens_core::{RunEvent, RunId, SuiteStatus, TestSession, TestStatus, TestSuiteResult};
use tokio::sync::mpsc;

/// Exit code used when the run was interrupted, as shells report for SIGINT.
const INTERRUPTED_EXIT_CODE: u8 = 130;

#[derive(Serialize)]
struct JsonReport<'a> {
    run: Option<RunId>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    elapsed_ms: Option<i64>,
    #[serde(flatten)]
    suite: &'a TestSuiteResult,
}

/// Render live progress from run events until the run finishes.
pub async fn show_progress(mut events: mpsc::UnboundedReceiver<RunEvent>) {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb.set_message("waiting for test output");
    pb.enable_steady_tick(Duration::from_millis(100));

    while let Some(event) = events.recv().await {
        match event {
            RunEvent::Planned { count } => pb.inc_length(u64::from(count)),
            RunEvent::TestStarted { name } => pb.set_message(name),
            RunEvent::TestFinished { name, status, .. } => {
                pb.inc(1);
                if status == TestStatus::Failed {
                    pb.println(format!("FAILED {}", name));
                }
                pb.set_message(name);
            }
            RunEvent::RunFinished { .. } => break,
            RunEvent::RunStarted { .. } | RunEvent::Summary { .. } | RunEvent::Output { .. } => {}
        }
    }

    pb.finish_and_clear();
}

/// Print the final report for a session.
pub fn print(session: &TestSession, json: bool, show_output: bool) -> Result<()> {
    if json {
        let report = JsonReport {
            run: session.run_id(),
            started_at: session.started_at(),
            finished_at: session.finished_at(),
            elapsed_ms: session.elapsed_ms(),
            suite: session.suite(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let suite = session.suite();
    for (name, result) in &suite.tests {
        match result.duration_ms {
            Some(ms) => println!("test {} ... {} ({}ms)", name, result.status.display_name(), ms),
            None => println!("test {} ... {}", name, result.status.display_name()),
        }
    }

    let shown: Vec<_> = suite
        .tests
        .iter()
        .filter(|(_, r)| !r.output.is_empty())
        .filter(|(_, r)| show_output || r.status == TestStatus::Failed)
        .collect();
    if !shown.is_empty() {
        println!();
        for (name, result) in shown {
            println!("---- {} ----", name);
            for line in result.output.lines() {
                println!("    {}", line);
            }
        }
    }

    println!();
    println!("{}", suite.summary());
    Ok(())
}

/// Map a finished run to a process exit code.
pub fn exit_code(suite: &TestSuiteResult) -> ExitCode {
    match suite.status {
        SuiteStatus::Completed if suite.failed == 0 => ExitCode::SUCCESS,
        SuiteStatus::Aborted => ExitCode::from(INTERRUPTED_EXIT_CODE),
        _ => ExitCode::FAILURE,
    }
}
