use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const REQSPLIT_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const REQSPLIT_BEFORE_HELP: &str = concat!(
    "reqsplit ",
    env!("CARGO_PKG_VERSION"),
    " – split installed packages into production and development requirements\n\n",
    "\x1b[1;36mCommands\x1b[0m\n",
    "  update           Write requirements.txt and requirements-dev.txt for a project.\n",
    "  imports          List the top-level modules a project imports.\n",
    "  snapshot         List the installed packages reqsplit would classify.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "reqsplit",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = REQSPLIT_BEFORE_HELP,
    help_template = REQSPLIT_HELP_TEMPLATE
)]
pub struct ReqsplitCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase logging (-vv reaches trace)",
        global = true
    )]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "PATH",
        help = "Read settings from this file instead of reqsplit.toml/pyproject.toml",
        global = true
    )]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(
        about = "Write production and development requirements for a project.",
        override_usage = "reqsplit update [PROJECT] [--dry-run | --check]",
        after_help = "Examples:\n  reqsplit update\n  reqsplit update src/myapp --output-dir .\n  reqsplit update --installed frozen.txt --check"
    )]
    Update(UpdateArgs),
    #[command(
        about = "List the top-level modules a project imports.",
        override_usage = "reqsplit imports [PROJECT]"
    )]
    Imports(ImportsArgs),
    #[command(
        about = "List the installed packages that would be classified.",
        override_usage = "reqsplit snapshot [--installed FILE] [--all]"
    )]
    Snapshot(SnapshotArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InterpreterArgs {
    #[arg(
        long,
        value_name = "PATH",
        help = "Python interpreter whose environment is queried"
    )]
    pub python: Option<String>,
    #[arg(
        long,
        value_name = "DIR",
        conflicts_with = "python",
        help = "Virtual environment whose interpreter is queried"
    )]
    pub venv: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EnvironmentArgs {
    #[command(flatten)]
    pub interpreter: InterpreterArgs,
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = ["python", "venv"],
        help = "Read installed packages from a `pip freeze` listing"
    )]
    pub installed: Option<PathBuf>,
    #[arg(long, help = "Keep pip, setuptools, wheel, and distribute in the snapshot")]
    pub all: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    #[arg(
        value_name = "PROJECT",
        help = "Source directory, Python file, or importable package name (default: .)"
    )]
    pub project: Option<String>,
    #[command(flatten)]
    pub environment: EnvironmentArgs,
    #[arg(
        long,
        value_name = "DIR",
        help = "Directory for the requirements files (default: the project directory)"
    )]
    pub output_dir: Option<PathBuf>,
    #[arg(long, help = "Render the requirements without writing them")]
    pub dry_run: bool,
    #[arg(
        long,
        conflicts_with = "dry_run",
        help = "Fail when the requirements files on disk are out of date"
    )]
    pub check: bool,
}

#[derive(Args, Debug)]
pub struct ImportsArgs {
    #[arg(
        value_name = "PROJECT",
        help = "Source directory, Python file, or importable package name (default: .)"
    )]
    pub project: Option<String>,
    #[command(flatten)]
    pub interpreter: InterpreterArgs,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub environment: EnvironmentArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        ReqsplitCli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = ReqsplitCli::try_parse_from([
            "reqsplit", "update", "app", "--json", "-vv", "--installed", "frozen.txt",
        ])
        .expect("parse");
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        let CommandGroupCli::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.project.as_deref(), Some("app"));
        assert_eq!(args.environment.installed, Some(PathBuf::from("frozen.txt")));
    }

    #[test]
    fn dry_run_and_check_conflict() {
        let err = ReqsplitCli::try_parse_from(["reqsplit", "update", "--dry-run", "--check"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn installed_conflicts_with_interpreter_flags() {
        let err = ReqsplitCli::try_parse_from([
            "reqsplit",
            "snapshot",
            "--installed",
            "frozen.txt",
            "--python",
            "python3",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
