//! Command implementations.

pub mod classify;
pub mod config;
pub mod run;
pub mod watch;

pub use self::classify::execute_classify;
pub use self::config::execute_config;
pub use self::run::execute_run;
pub use self::watch::execute_watch;

use crate::cli::{ClassifierArgs, RunOverrides, SourceArgs};
use crate::error::{CliError, Result};
use tasksift_fetch::AsanaSource;
use tasksift_llm::AssistantClassifier;
use tasksift_pipeline::PipelineConfig;

/// Apply command-line overrides to the loaded pipeline configuration.
pub fn apply_overrides(config: &mut PipelineConfig, overrides: &RunOverrides) {
    if let Some(dir) = &overrides.output {
        config.output_dir = Some(dir.clone());
    }
    if overrides.no_artifacts {
        config.output_dir = None;
    }
    if overrides.include_containers {
        config.filter.include_containers = true;
    }
    if let Some(size) = overrides.batch_size {
        config.classifier.batch_size = size;
    }
}

/// Build the Asana item source from credentials.
pub fn build_source(args: &SourceArgs, config: &PipelineConfig) -> Result<AsanaSource> {
    let token = args.asana_token.as_deref().ok_or(CliError::MissingCredential {
        flag: "asana-token",
        env: "ASANA_TOKEN",
    })?;
    let workspace = args.workspace.as_deref().ok_or(CliError::MissingCredential {
        flag: "workspace",
        env: "ASANA_WORKSPACE",
    })?;
    Ok(AsanaSource::new(workspace, token, &config.fetch)?)
}

/// Build the assistant classifier from credentials.
pub fn build_classifier(
    args: &ClassifierArgs,
    config: &mut PipelineConfig,
) -> Result<AssistantClassifier> {
    let key = args.openai_key.as_deref().ok_or(CliError::MissingCredential {
        flag: "openai-key",
        env: "OPENAI_API_KEY",
    })?;
    if let Some(assistant) = &args.assistant {
        config.assistant.assistant_id = assistant.clone();
    }
    Ok(AssistantClassifier::new(key, config.assistant.clone())?)
}
