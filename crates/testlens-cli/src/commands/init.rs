use color_eyre::eyre::{bail, Result, WrapErr};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use testlens_core::config::PROJECT_CONFIG_FILE;
use testlens_core::Config;

pub fn execute(force: bool) -> Result<ExitCode> {
    let path = Path::new(PROJECT_CONFIG_FILE);
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    fs::write(path, Config::default_config_string())
        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(ExitCode::SUCCESS)
}
