//! Command-line interface definitions.
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "syskit",
    about = "Idempotent bootstrap and dotfile maintenance for Linux systems",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Override the repository root (the directory containing `conf/`)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Disable parallel execution of operations within tasks (parallel is enabled by default)
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,

    /// Do not keep timestamped backups of edited files
    #[arg(long = "no-backup", global = true, action = clap::ArgAction::SetFalse)]
    pub backup: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install packages, merge blocks and configure the system
    Install(InstallOpts),
    /// Merge one block file into one target file
    Merge(MergeOpts),
    /// Inspect or install catalog packages
    #[command(subcommand)]
    Packages(PackagesCommand),
    /// Print the detected platform
    Detect,
    /// Print a shell completion script
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Skip specific tasks
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only specific tasks
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `merge` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct MergeOpts {
    /// Block file to merge
    pub source: PathBuf,

    /// File to merge into (created if missing)
    pub target: PathBuf,

    /// Drop the previously merged section (from the block's first line) before merging
    #[arg(long)]
    pub clean: bool,
}

/// `packages` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum PackagesCommand {
    /// Show every catalog package with its install status
    Status(StatusOpts),
    /// Install the named packages
    Install(PackageInstallOpts),
}

/// Options for `packages status`.
#[derive(Parser, Debug, Clone)]
pub struct StatusOpts {
    /// Only show this group
    #[arg(long)]
    pub group: Option<String>,
}

/// Options for `packages install`.
#[derive(Parser, Debug, Clone)]
pub struct PackageInstallOpts {
    /// Package names
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Options for the `completions` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    pub shell: Shell,
}

impl Command {
    /// Name used for the log file of this invocation.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Merge(_) => "merge",
            Self::Packages(_) => "packages",
            Self::Detect => "detect",
            Self::Completions(_) => "completions",
            Self::Version => "version",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::unreachable
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_dry_run_short() {
        let cli = Cli::parse_from(["syskit", "-d", "install"]);
        assert!(cli.global.dry_run);
        assert!(matches!(cli.command, Command::Install(_)));
    }

    #[test]
    fn parse_install_skip_tasks() {
        let cli = Cli::parse_from(["syskit", "install", "--skip", "packages,fstab"]);
        let Command::Install(opts) = cli.command else {
            unreachable!("expected install");
        };
        assert_eq!(opts.skip, vec!["packages", "fstab"]);
        assert!(opts.only.is_empty());
    }

    #[test]
    fn parse_install_only_tasks() {
        let cli = Cli::parse_from(["syskit", "install", "--only", "blocks"]);
        let Command::Install(opts) = cli.command else {
            unreachable!("expected install");
        };
        assert_eq!(opts.only, vec!["blocks"]);
    }

    #[test]
    fn parse_merge_with_clean() {
        let cli = Cli::parse_from(["syskit", "merge", "blocks/bashrc", "/home/u/.bashrc", "--clean"]);
        let Command::Merge(opts) = cli.command else {
            unreachable!("expected merge");
        };
        assert_eq!(opts.source, PathBuf::from("blocks/bashrc"));
        assert_eq!(opts.target, PathBuf::from("/home/u/.bashrc"));
        assert!(opts.clean);
    }

    #[test]
    fn parse_packages_status_group() {
        let cli = Cli::parse_from(["syskit", "packages", "status", "--group", "Base"]);
        let Command::Packages(PackagesCommand::Status(opts)) = cli.command else {
            unreachable!("expected packages status");
        };
        assert_eq!(opts.group.as_deref(), Some("Base"));
    }

    #[test]
    fn packages_install_requires_names() {
        assert!(Cli::try_parse_from(["syskit", "packages", "install"]).is_err());
        let cli = Cli::parse_from(["syskit", "packages", "install", "git", "curl"]);
        let Command::Packages(PackagesCommand::Install(opts)) = cli.command else {
            unreachable!("expected packages install");
        };
        assert_eq!(opts.names, vec!["git", "curl"]);
    }

    #[test]
    fn parse_completions_shell() {
        let cli = Cli::parse_from(["syskit", "completions", "bash"]);
        let Command::Completions(opts) = cli.command else {
            unreachable!("expected completions");
        };
        assert_eq!(opts.shell, Shell::Bash);
    }

    #[test]
    fn parse_detect_and_version() {
        assert!(matches!(
            Cli::parse_from(["syskit", "detect"]).command,
            Command::Detect
        ));
        assert!(matches!(
            Cli::parse_from(["syskit", "version"]).command,
            Command::Version
        ));
    }

    #[test]
    fn parse_root_override() {
        let cli = Cli::parse_from(["syskit", "--root", "/srv/syskit", "install"]);
        assert_eq!(cli.global.root, Some(PathBuf::from("/srv/syskit")));
    }

    #[test]
    fn parallel_and_backup_default_on() {
        let cli = Cli::parse_from(["syskit", "install"]);
        assert!(cli.global.parallel);
        assert!(cli.global.backup);
        assert!(!cli.verbose);
    }

    #[test]
    fn no_flags_turn_parallel_and_backup_off() {
        let cli = Cli::parse_from(["syskit", "--no-parallel", "--no-backup", "-v", "install"]);
        assert!(!cli.global.parallel);
        assert!(!cli.global.backup);
        assert!(cli.verbose);
    }
}
