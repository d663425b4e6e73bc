use color_eyre::eyre::{Result, WrapErr};
use std::path::Path;
use std::process::ExitCode;
use testlens_core::{discover_directory, Config, TestFunction};

pub fn execute(config: &Config, root: &Path, json: bool) -> Result<ExitCode> {
    let files = discover_directory(root, &config.discovery)
        .wrap_err_with(|| format!("failed to discover tests under {}", root.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(ExitCode::SUCCESS);
    }

    let mut total = 0;
    for file in &files {
        println!("{}", file.path);
        for test in &file.tests {
            println!("  {:>5}  {}{}", test.line_number, test.qualified_name(), flags(test));
        }
        total += file.tests.len();
    }

    println!();
    println!(
        "{} {} in {} {}",
        total,
        if total == 1 { "test" } else { "tests" },
        files.len(),
        if files.len() == 1 { "file" } else { "files" }
    );
    Ok(ExitCode::SUCCESS)
}

fn flags(test: &TestFunction) -> String {
    let mut out = String::new();
    if test.is_async {
        out.push_str(" [async]");
    }
    if test.is_integration {
        out.push_str(" [integration]");
    }
    if test.is_ignored {
        out.push_str(" [ignored]");
    }
    out
}
