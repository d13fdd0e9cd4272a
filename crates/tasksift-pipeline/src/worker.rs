//! Background worker for periodic pipeline runs

use crate::{Pipeline, PipelineError, RunMetrics};
use chrono::{Local, NaiveDate};
use std::fmt::Display;
use tasksift_domain::traits::{Classifier, ItemSource, ReportSink};
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that runs the pipeline on a schedule
///
/// A failed run is logged and counted; the worker keeps going. Runs never
/// overlap: the next tick is awaited only after the current run finishes.
///
/// # Examples
///
/// ```no_run
/// use tasksift_fetch::MockSource;
/// use tasksift_llm::MockClassifier;
/// use tasksift_pipeline::{MemorySink, Pipeline, PipelineConfig, PipelineWorker};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PipelineConfig::default();
///     let interval = config.interval();
///     let pipeline = Pipeline::new(MockSource::new(Vec::new()), MockClassifier::echo(), config)?;
///     let mut worker = PipelineWorker::new(pipeline, interval);
///
///     // Run until Ctrl+C
///     worker.run(&mut MemorySink::default()).await;
///     Ok(())
/// }
/// ```
pub struct PipelineWorker<S, C> {
    pipeline: Pipeline<S, C>,
    interval: Duration,
    today: Box<dyn Fn() -> NaiveDate + Send + Sync>,
    runs: usize,
    failures: usize,
    last: Option<RunMetrics>,
}

impl<S, C> PipelineWorker<S, C>
where
    S: ItemSource,
    C: Classifier + 'static,
{
    /// Create a worker running `pipeline` every `interval`
    pub fn new(pipeline: Pipeline<S, C>, interval: Duration) -> Self {
        Self {
            pipeline,
            interval,
            today: Box::new(|| Local::now().date_naive()),
            runs: 0,
            failures: 0,
            last: None,
        }
    }

    /// Use a fixed clock for the reporting date
    pub fn with_today<F>(mut self, today: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.today = Box::new(today);
        self
    }

    /// Run until a shutdown signal (Ctrl+C) is received
    pub async fn run<K>(&mut self, sink: &mut K)
    where
        K: ReportSink,
        K::Error: Display,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Pipeline worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle(sink).await;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping worker");
                    break;
                }
            }
        }

        tracing::info!(
            "Pipeline worker stopped after {} runs ({} failed)",
            self.runs,
            self.failures
        );
    }

    /// Run for a specific number of cycles.
    ///
    /// Returns the first error encountered, after which no further cycle runs.
    pub async fn run_cycles<K>(&mut self, sink: &mut K, cycles: usize) -> Result<(), PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "Pipeline worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting cycle {}/{}", cycle + 1, cycles);
            self.execute(sink).await?;
        }

        Ok(())
    }

    async fn cycle<K>(&mut self, sink: &mut K)
    where
        K: ReportSink,
        K::Error: Display,
    {
        if let Err(e) = self.execute(sink).await {
            tracing::error!("Run failed: {}", e);
        }
    }

    async fn execute<K>(&mut self, sink: &mut K) -> Result<(), PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        let today = (self.today)();
        self.runs += 1;
        match self.pipeline.run(today, sink).await {
            Ok(report) => {
                tracing::info!(
                    "Run {} completed: {} results, {}",
                    report.run_id.short(),
                    report.metrics.classified,
                    if report.is_complete() { "complete" } else { "partial" }
                );
                self.last = Some(report.metrics);
                Ok(())
            }
            Err(e) => {
                self.failures += 1;
                Err(e)
            }
        }
    }

    /// Runs attempted so far
    pub fn runs(&self) -> usize {
        self.runs
    }

    /// Runs that ended in an error
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Metrics of the most recent successful run
    pub fn last_metrics(&self) -> Option<&RunMetrics> {
        self.last.as_ref()
    }

    /// The pipeline being run
    pub fn pipeline(&self) -> &Pipeline<S, C> {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySink, PipelineConfig};
    use tasksift_domain::{Item, SourceResponse};
    use tasksift_fetch::MockSource;
    use tasksift_llm::MockClassifier;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn pipeline(source: MockSource) -> Pipeline<MockSource, MockClassifier> {
        let config = PipelineConfig {
            output_dir: None,
            ..Default::default()
        };
        Pipeline::new(source, MockClassifier::echo(), config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles() {
        let source = MockSource::new(vec![Item::new("1", "Draft lead").with_due(day())]);
        let mut worker =
            PipelineWorker::new(pipeline(source), Duration::from_secs(60)).with_today(day);
        let mut sink = MemorySink::default();

        let started = tokio::time::Instant::now();
        worker.run_cycles(&mut sink, 3).await.unwrap();

        assert_eq!(worker.runs(), 3);
        assert_eq!(worker.failures(), 0);
        assert_eq!(sink.results.len(), 3);
        assert_eq!(worker.last_metrics().unwrap().classified, 1);
        // First tick fires immediately
        assert!(started.elapsed() >= Duration::from_secs(120));

        let ids: Vec<_> = sink.results.iter().map(|(id, _)| *id).collect();
        assert!(ids[0] != ids[1] && ids[1] != ids[2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles_stops_on_error() {
        let source = MockSource::new(Vec::new()).always(SourceResponse::Rejected {
            status: 401,
            message: "Not Authorized".to_string(),
        });
        let mut worker =
            PipelineWorker::new(pipeline(source), Duration::from_secs(60)).with_today(day);

        let result = worker.run_cycles(&mut MemorySink::default(), 3).await;

        assert!(matches!(result, Err(PipelineError::FetchFailed { .. })));
        assert_eq!(worker.runs(), 1);
        assert_eq!(worker.failures(), 1);
        assert!(worker.last_metrics().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycle_logs_and_continues() {
        let source = MockSource::new(Vec::new()).always(SourceResponse::Rejected {
            status: 401,
            message: "Not Authorized".to_string(),
        });
        let mut worker =
            PipelineWorker::new(pipeline(source), Duration::from_secs(60)).with_today(day);
        let mut sink = MemorySink::default();

        worker.cycle(&mut sink).await;
        worker.cycle(&mut sink).await;

        assert_eq!(worker.runs(), 2);
        assert_eq!(worker.failures(), 2);
        assert!(sink.results.is_empty());
    }
}
