//! Tasksift CLI - fetch, filter and classify a week of tracked work.

use clap::Parser;
use tasksift_cli::cli::{ConfigAction, ConfigArgs};
use tasksift_cli::commands;
use tasksift_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> tasksift_cli::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so table and JSON output stay clean on stdout
    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    // `config init` must work before a valid file exists
    let config = match &cli.command {
        Command::Config(ConfigArgs {
            action: ConfigAction::Init { .. },
        }) => Config::default(),
        _ => Config::load(cli.config.as_deref())?,
    };
    tracing::debug!(
        "Configuration loaded ({} owners, week offset {})",
        config.pipeline.owners.len(),
        config.pipeline.week_offset
    );

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, config, &formatter).await?,
        Command::Watch(args) => commands::execute_watch(args, config, &formatter).await?,
        Command::Classify(args) => commands::execute_classify(args, config, &formatter).await?,
        Command::Config(args) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter)?
        }
    }

    Ok(())
}
