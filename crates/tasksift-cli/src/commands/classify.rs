//! Classify command implementation.

use super::{apply_overrides, build_classifier};
use crate::cli::ClassifyArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tasksift_pipeline::{read_items, ItemProcessor, MemorySink};

/// Execute the classify command.
pub async fn execute_classify(
    args: ClassifyArgs,
    config: Config,
    formatter: &Formatter,
) -> Result<()> {
    let mut pipeline_config = config.pipeline;
    apply_overrides(&mut pipeline_config, &args.overrides);

    let items = read_items(&args.items)?;
    if items.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No items found in {}",
            args.items.display()
        )));
    }

    let classifier = build_classifier(&args.classifier, &mut pipeline_config)?;
    let processor = ItemProcessor::new(classifier, &pipeline_config)?;

    let report = match processor.artifacts().cloned() {
        Some(mut writer) => processor.classify_items(items, &mut writer).await?,
        None => processor.classify_items(items, &mut MemorySink::default()).await?,
    };

    println!("{}", formatter.format_report(&report)?);
    Ok(())
}
