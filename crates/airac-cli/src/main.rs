//! AIRAC package updater CLI
//!
//! Installs a sector package for one region and re-applies the user's
//! settings and layout to it, with a snapshot to fall back on.

mod cli;
mod error;
mod logging;
mod report;

use std::path::Path;

use clap::Parser;
use colored::Colorize;

use airac_core::{
    HttpFetcher, PackageSource, Pipeline, RegionRegistry, RunOptions, Settings, ZipExtractor,
};

use cli::Cli;
use error::{CliError, Result};

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns the process exit code for the run's outcome.
fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;
    tracing::debug!(config = %cli.config.display(), "Verbose mode enabled");

    let settings = load_settings(&cli.config)?;
    let registry = RegionRegistry::with_builtins();
    let source = PackageSource::from_arg(&cli.package, &registry, &settings.paths.download_dir);

    let fetcher = HttpFetcher::new()?;
    let extractor = ZipExtractor::new();
    let options = RunOptions {
        dry_run: cli.dry_run,
        backup: !cli.no_backup,
        diffs: cli.verbose || cli.json,
    };

    if !cli.json {
        let action = if cli.dry_run { "Simulating update from" } else { "Updating from" };
        println!("{} {} {}", "=>".blue().bold(), action, source.to_string().cyan());
    }

    let result = Pipeline::new(&settings, &registry, &fetcher, &extractor)
        .with_options(options)
        .run(&source);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        report::print(&result, cli.verbose);
    }
    Ok(result.outcome.exit_code())
}

/// Load the settings, writing a template first when the file is missing.
fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        airac_fs::io::write_atomic(path, Settings::template().as_bytes())?;
        return Err(CliError::user(format!(
            "No settings found. A template was written to {}; edit it and run again.",
            path.display()
        )));
    }
    Ok(Settings::load(path)?)
}
