//! CLI command definitions and argument parsing.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Tasksift CLI - Fetch, filter and classify a week of tracked work.
#[derive(Debug, Parser)]
#[command(name = "tasksift")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.tasksift/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (run id and status only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline once for the configured week
    Run(RunArgs),

    /// Run the pipeline on an interval until Ctrl+C
    Watch(WatchArgs),

    /// Classify an existing items snapshot (JSON lines)
    Classify(ClassifyArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Credentials for the item source, passed through untouched.
#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    /// Asana personal access token
    #[arg(long, env = "ASANA_TOKEN", hide_env_values = true)]
    pub asana_token: Option<String>,

    /// Asana workspace gid
    #[arg(long, env = "ASANA_WORKSPACE")]
    pub workspace: Option<String>,
}

/// Credentials for the classifier, passed through untouched.
#[derive(Debug, Clone, Args)]
pub struct ClassifierArgs {
    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_key: Option<String>,

    /// Assistant id (overrides the config file)
    #[arg(long, env = "OPENAI_ASSISTANT_ID")]
    pub assistant: Option<String>,
}

/// Overrides shared by commands that classify.
#[derive(Debug, Clone, Args)]
pub struct RunOverrides {
    /// Artifact directory (overrides the config file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not write artifacts
    #[arg(long, conflicts_with = "output")]
    pub no_artifacts: bool,

    /// Keep container items in the working set
    #[arg(long)]
    pub include_containers: bool,

    /// Maximum items per classifier batch
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Arguments for the run command.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Week relative to the current one (-1 = last week)
    #[arg(short, long, allow_hyphen_values = true)]
    pub week: Option<i64>,

    /// Reporting date (default: today)
    #[arg(long)]
    pub today: Option<NaiveDate>,

    #[command(flatten)]
    pub overrides: RunOverrides,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub classifier: ClassifierArgs,
}

/// Arguments for the watch command.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Minutes between runs (overrides the config file)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Stop after this many runs
    #[arg(long)]
    pub cycles: Option<usize>,

    /// Week relative to the current one (-1 = last week)
    #[arg(short, long, allow_hyphen_values = true)]
    pub week: Option<i64>,

    #[command(flatten)]
    pub overrides: RunOverrides,

    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub classifier: ClassifierArgs,
}

/// Arguments for the classify command.
#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Items snapshot written by a previous run
    pub items: PathBuf,

    #[command(flatten)]
    pub overrides: RunOverrides,

    #[command(flatten)]
    pub classifier: ClassifierArgs,
}

/// Arguments for configuration management.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["tasksift", "run", "--week", "-1", "--today", "2025-05-07"]);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.week, Some(-1));
                assert_eq!(args.today, NaiveDate::from_ymd_opt(2025, 5, 7));
                assert!(!args.overrides.include_containers);
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["tasksift", "-vv", "config", "show", "--format", "json"]);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.format, Some(CliFormat::Json)));
        assert!(matches!(
            cli.command,
            Command::Config(ConfigArgs {
                action: ConfigAction::Show
            })
        ));
    }

    #[test]
    fn test_classify_command() {
        let cli = Cli::parse_from([
            "tasksift",
            "classify",
            "runs/items.jsonl",
            "--include-containers",
            "--batch-size",
            "20",
        ]);
        match cli.command {
            Command::Classify(args) => {
                assert_eq!(args.items, PathBuf::from("runs/items.jsonl"));
                assert!(args.overrides.include_containers);
                assert_eq!(args.overrides.batch_size, Some(20));
            }
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_watch_command() {
        let cli = Cli::parse_from(["tasksift", "watch", "--interval", "15", "--cycles", "2"]);
        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.interval, Some(15));
                assert_eq!(args.cycles, Some(2));
            }
            _ => panic!("Expected Watch command"),
        }
    }

    #[test]
    fn test_output_conflicts_with_no_artifacts() {
        let result = Cli::try_parse_from(["tasksift", "run", "-o", "out", "--no-artifacts"]);
        assert!(result.is_err());
    }
}
