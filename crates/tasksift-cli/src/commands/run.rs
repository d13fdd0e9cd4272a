//! Run command implementation.

use super::{apply_overrides, build_classifier, build_source};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use chrono::Local;
use tasksift_pipeline::{MemorySink, Pipeline};

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: Config, formatter: &Formatter) -> Result<()> {
    let mut pipeline_config = config.pipeline;
    apply_overrides(&mut pipeline_config, &args.overrides);
    if let Some(week) = args.week {
        pipeline_config.week_offset = week;
    }

    let source = build_source(&args.source, &pipeline_config)?;
    let classifier = build_classifier(&args.classifier, &mut pipeline_config)?;
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let pipeline = Pipeline::new(source, classifier, pipeline_config)?;
    let report = match pipeline.artifacts().cloned() {
        Some(mut writer) => pipeline.run(today, &mut writer).await?,
        None => pipeline.run(today, &mut MemorySink::default()).await?,
    };

    println!("{}", formatter.format_report(&report)?);
    if let Some(writer) = pipeline.artifacts() {
        eprintln!(
            "{}",
            formatter.info(&format!("Artifacts in {}", writer.dir().display()))
        );
    }

    Ok(())
}

