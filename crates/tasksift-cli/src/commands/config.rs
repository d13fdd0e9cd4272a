//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub fn execute_config(
    args: ConfigArgs,
    config: &Config,
    path: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    let resolved = Config::resolve(path)?;

    match args.action {
        ConfigAction::Init { force } => {
            if resolved.exists() && !force {
                return Err(CliError::InvalidInput(format!(
                    "{} already exists (use --force to overwrite)",
                    resolved.display()
                )));
            }
            Config::default().save(&resolved)?;
            println!(
                "{}",
                formatter.success(&format!("Wrote {}", resolved.display()))
            );
        }
        ConfigAction::Show => {
            println!("{}", formatter.format_config(config)?);
        }
        ConfigAction::Path => {
            println!("{}", resolved.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let init = |force| ConfigArgs {
            action: ConfigAction::Init { force },
        };

        execute_config(init(false), &Config::default(), Some(&path), &formatter).unwrap();
        assert!(Config::load(Some(&path)).is_ok());

        let result = execute_config(init(false), &Config::default(), Some(&path), &formatter);
        assert!(matches!(result, Err(CliError::InvalidInput(_))));

        execute_config(init(true), &Config::default(), Some(&path), &formatter).unwrap();
    }
}
