use color_eyre::eyre::{Result, WrapErr};
use std::path::Path;
use std::process::ExitCode;
use testlens_core::{StaticRunner, TestSession};
use tokio_util::sync::CancellationToken;

use crate::report;

pub async fn execute(
    file: &Path,
    test: Option<&str>,
    json: bool,
    show_output: bool,
) -> Result<ExitCode> {
    let bytes = tokio::fs::read(file)
        .await
        .wrap_err_with(|| format!("failed to read transcript {}", file.display()))?;
    let runner = StaticRunner::from_transcript(String::from_utf8_lossy(&bytes));

    let mut session = TestSession::new();
    testlens_core::execute(&runner, &mut session, None, CancellationToken::new(), None).await?;

    let Some(name) = test else {
        report::print(&session, json, show_output)?;
        return Ok(report::exit_code(session.suite()));
    };

    let view = session.lookup_name(name);
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        match (&view.key, view.tier) {
            (Some(key), Some(tier)) => {
                println!("{} ({:?} match for {})", key, tier, name);
                match view.duration_ms {
                    Some(ms) => println!("status: {} ({}ms)", view.status.display_name(), ms),
                    None => println!("status: {}", view.status.display_name()),
                }
                println!();
                print!("{}", view.output);
            }
            _ => println!("no test in the transcript matches {}", name),
        }
    }

    Ok(if view.key.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
