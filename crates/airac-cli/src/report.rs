//! Human-readable rendering of a pipeline result

use std::fmt::Write;

use airac_core::{Outcome, PipelineResult};
use colored::Colorize;

pub fn print(result: &PipelineResult, verbose: bool) {
    print!("{}", render(result, verbose));
}

pub fn render(result: &PipelineResult, verbose: bool) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, result, verbose);
    out
}

fn write_report(out: &mut String, result: &PipelineResult, verbose: bool) -> std::fmt::Result {
    if let Some(region) = &result.region {
        let cycle = result
            .airac
            .as_deref()
            .map(|c| format!(" AIRAC {}", c))
            .unwrap_or_default();
        writeln!(out, "{} {}{}", "=>".blue().bold(), region.cyan(), cycle)?;
    }
    if let Some(root) = &result.install_root {
        writeln!(out, "   install root: {}", root.display())?;
    }
    if let Some(snapshot) = &result.snapshot {
        writeln!(out, "   snapshot: {}", snapshot.dimmed())?;
    }
    if result.extracted > 0 {
        writeln!(out, "   extracted {} files", result.extracted)?;
    }

    if verbose {
        for rule in &result.rules {
            writeln!(
                out,
                "   {} {} ({} matched, {} changed)",
                "*".dimmed(),
                rule.rule,
                rule.matched.len(),
                rule.modified.len()
            )?;
        }
    }

    let marker = if result.dry_run { "~".yellow() } else { "+".green() };
    for path in &result.modified {
        writeln!(out, "   {} {}", marker, path)?;
    }
    if verbose {
        for diff in result.changes.iter().filter_map(|c| c.diff.as_deref()) {
            write_diff(out, diff)?;
        }
    }

    if !result.warnings.is_empty() {
        writeln!(out)?;
        for warning in &result.warnings {
            writeln!(out, "{} {}", "WARN".yellow().bold(), warning)?;
        }
    }

    writeln!(out)?;
    let count = result.modified.len();
    match result.outcome {
        Outcome::Committed => {
            writeln!(out, "{} Update committed, {} file(s) changed.", "OK".green().bold(), count)?;
        }
        Outcome::DryRunOnly => {
            writeln!(
                out,
                "{} {} file(s) would change. Nothing was written.",
                "DRY RUN".yellow().bold(),
                count
            )?;
        }
        Outcome::RolledBack => {
            writeln!(out, "{} Update failed and was rolled back.", "ROLLED BACK".red().bold())?;
            write_causes(out, &result.error)?;
        }
        Outcome::Failed => {
            writeln!(out, "{} Update failed.", "FAILED".red().bold())?;
            write_causes(out, &result.error)?;
        }
        Outcome::Inconsistent => {
            writeln!(
                out,
                "{} Update failed and the rollback failed too; the installation may be damaged.",
                "INCONSISTENT".red().bold()
            )?;
            write_causes(out, &result.error)?;
            writeln!(out, "   rollback:")?;
            write_causes(out, &result.rollback_error)?;
            if let Some(snapshot) = &result.snapshot {
                writeln!(out, "   The snapshot {} is kept for manual recovery.", snapshot.cyan())?;
            }
        }
    }
    Ok(())
}

fn write_causes(out: &mut String, chain: &[String]) -> std::fmt::Result {
    for (i, cause) in chain.iter().enumerate() {
        if i == 0 {
            writeln!(out, "   {} {}", "!".red(), cause)?;
        } else {
            writeln!(out, "     caused by: {}", cause)?;
        }
    }
    Ok(())
}

fn write_diff(out: &mut String, diff: &str) -> std::fmt::Result {
    for line in diff.lines() {
        let line = if line.starts_with("+++") || line.starts_with("---") {
            line.bold()
        } else if line.starts_with('+') {
            line.green()
        } else if line.starts_with('-') {
            line.red()
        } else if line.starts_with("@@") {
            line.cyan()
        } else {
            line.normal()
        };
        writeln!(out, "     {}", line)?;
    }
    Ok(())
}
