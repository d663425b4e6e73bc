use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use testlens_core::Config;

mod commands;
mod report;

#[derive(Parser)]
#[command(name = "testlens")]
#[command(about = "Discover tests, run them, and read each test's own output", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ./testlens.toml or the user config
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List test functions found in source files
    Discover {
        /// Project root to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Print JSON instead of a listing
        #[arg(long)]
        json: bool,
    },
    /// Run the configured test runner and correlate its output
    Run(RunArgs),
    /// Feed a saved runner transcript through the parser and correlator
    Replay {
        /// Transcript file
        file: PathBuf,

        /// Show one test's result and output, matched by name
        #[arg(long, value_name = "NAME")]
        test: Option<String>,

        /// Print JSON instead of a report
        #[arg(long)]
        json: bool,

        /// Print every test's output, not just failures
        #[arg(long)]
        show_output: bool,
    },
    /// Write a testlens.toml with the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Only run tests whose name contains this filter
    #[arg(short, long)]
    filter: Option<String>,

    /// Use the Clarinet preset instead of the configured runner
    #[arg(long)]
    clarinet: bool,

    /// Print JSON instead of a report
    #[arg(long)]
    json: bool,

    /// Print every test's output, not just failures
    #[arg(long)]
    show_output: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Discover { path, json } => {
            let config = load_config(cli.config.as_deref())?;
            commands::discover::execute(&config, &path, json)
        }
        Commands::Run(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::run::execute(&config, args).await
        }
        Commands::Replay {
            file,
            test,
            json,
            show_output,
        } => commands::replay::execute(&file, test.as_deref(), json, show_output).await,
        Commands::Init { force } => commands::init::execute(force),
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path)
            .wrap_err_with(|| format!("failed to load config from {}", path.display())),
        None => Config::load().wrap_err("failed to load configuration"),
    }
}
