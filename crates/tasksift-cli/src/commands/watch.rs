//! Watch command implementation.

use super::{apply_overrides, build_classifier, build_source};
use crate::cli::WatchArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use tasksift_pipeline::{MemorySink, Pipeline, PipelineWorker};

/// Execute the watch command.
pub async fn execute_watch(args: WatchArgs, config: Config, formatter: &Formatter) -> Result<()> {
    let mut pipeline_config = config.pipeline;
    apply_overrides(&mut pipeline_config, &args.overrides);
    if let Some(week) = args.week {
        pipeline_config.week_offset = week;
    }
    if let Some(minutes) = args.interval {
        if minutes == 0 {
            return Err(CliError::InvalidInput(
                "Interval must be at least 1 minute".to_string(),
            ));
        }
        pipeline_config.interval_minutes = minutes;
    }

    let source = build_source(&args.source, &pipeline_config)?;
    let classifier = build_classifier(&args.classifier, &mut pipeline_config)?;
    let interval = pipeline_config.interval();

    let pipeline = Pipeline::new(source, classifier, pipeline_config)?;
    let writer = pipeline.artifacts().cloned();
    let mut worker = PipelineWorker::new(pipeline, interval);

    eprintln!(
        "{}",
        formatter.info(&format!(
            "Running every {} minutes, Ctrl+C to stop",
            interval.as_secs() / 60
        ))
    );

    match (args.cycles, writer) {
        (Some(cycles), Some(mut writer)) => worker.run_cycles(&mut writer, cycles).await?,
        (Some(cycles), None) => worker.run_cycles(&mut MemorySink::default(), cycles).await?,
        (None, Some(mut writer)) => worker.run(&mut writer).await,
        (None, None) => worker.run(&mut MemorySink::default()).await,
    }

    let summary = format!("{} runs, {} failed", worker.runs(), worker.failures());
    if worker.failures() == 0 {
        println!("{}", formatter.success(&summary));
    } else {
        println!("{}", formatter.warning(&summary));
    }
    if let Some(metrics) = worker.last_metrics() {
        println!("{}", metrics.summary());
    }

    Ok(())
}
