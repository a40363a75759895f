//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::Parser;

/// AIRAC package updater - install a sector package and apply your settings
#[derive(Parser, Debug)]
#[command(name = "airac")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Region id (EDGG, EDMM, ...) to download, or an archive path or name
    ///
    /// Names that are not registered regions are looked up as files, then
    /// in the download directory (".zip" is added when missing).
    pub package: String,

    /// Settings file; a commented template is written when it is missing
    #[arg(short, long, env = "AIRAC_CONFIG", default_value = "airac.toml")]
    pub config: PathBuf,

    /// Do not snapshot the installation first (failures cannot be rolled back)
    #[arg(long)]
    pub no_backup: bool,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output (debug logs, per-rule detail and diffs)
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the run result as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from(["airac", "EDGG", "--dry-run", "--no-backup", "-c", "my.toml"]);
        assert_eq!(cli.package, "EDGG");
        assert!(cli.dry_run);
        assert!(cli.no_backup);
        assert_eq!(cli.config, PathBuf::from("my.toml"));
        assert!(!cli.json);
    }

    #[test]
    fn package_is_required() {
        assert!(Cli::try_parse_from(["airac"]).is_err());
    }
}
