use color_eyre::eyre::{Result, WrapErr};
use std::process::ExitCode;
use testlens_core::{Config, ProcessRunner, RunnerConfig, TestSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::report;
use crate::RunArgs;

pub async fn execute(config: &Config, args: RunArgs) -> Result<ExitCode> {
    let runner_config = if args.clarinet {
        RunnerConfig {
            cwd: config.runner.cwd.clone(),
            env: config.runner.env.clone(),
            ..RunnerConfig::clarinet()
        }
    } else {
        config.runner.clone()
    };
    let runner = ProcessRunner::new(runner_config);

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping run");
            interrupt.cancel();
        }
    });

    let mut session = TestSession::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let progress = (!args.json).then(|| tokio::spawn(report::show_progress(rx)));

    let result = testlens_core::execute(
        &runner,
        &mut session,
        args.filter.as_deref(),
        cancel,
        progress.as_ref().map(|_| &tx),
    )
    .await;
    drop(tx);

    if let Some(handle) = progress {
        handle.await.wrap_err("progress display panicked")?;
    }
    result.wrap_err("test run could not be started")?;

    report::print(&session, args.json, args.show_output)?;
    Ok(report::exit_code(session.suite()))
}
