//! One pipeline run: fetch, filter, classify, merge, report

use crate::artifacts::ArtifactWriter;
use crate::config::{CapacityConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::metrics::RunMetrics;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Display;
use tasksift_classifier::{merge_results, AdaptiveBatchClassifier, BatchAudit, PromptBuilder};
use tasksift_domain::traits::{ClassifiedMap, Classifier, ItemSource, ReportSink};
use tasksift_domain::{Item, RunId};
use tasksift_fetch::{fetch_dimensions, FetchPlan, PagedFetcher};
use tasksift_filter::ContainerFilter;
use tokio::time::Instant;
use tracing::{info, warn};

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run identifier stamped on every artifact
    pub run_id: RunId,
    /// Counters, tallies and the completion flag
    pub metrics: RunMetrics,
    /// De-duplicated items, containers included
    pub items: BTreeMap<String, Item>,
    /// Merged results by item id
    pub results: ClassifiedMap,
    /// One record per classifier call
    pub audits: Vec<BatchAudit>,
    /// Failed fetch dimensions, one line each
    pub fetch_failures: Vec<String>,
}

impl RunReport {
    /// Whether nothing was lost anywhere in the run
    pub fn is_complete(&self) -> bool {
        self.metrics.complete
    }
}

/// The stages after fetching: filter, classify, merge, report
///
/// Usable on its own to process an items snapshot without a source.
pub struct ItemProcessor<C> {
    filter: ContainerFilter,
    classifier: AdaptiveBatchClassifier<C>,
    artifacts: Option<ArtifactWriter>,
    owners: Vec<String>,
    capacity: CapacityConfig,
}

impl<C> ItemProcessor<C>
where
    C: Classifier + 'static,
{
    /// Build the filter, prompt and classifier from `config`
    pub fn new(classifier: C, config: &PipelineConfig) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;

        let prompt = PromptBuilder::from_files(
            config.instructions_path.as_deref(),
            config.rules_path.as_deref(),
        )?;

        Ok(Self {
            filter: ContainerFilter::new(config.filter.clone())?,
            classifier: AdaptiveBatchClassifier::new(classifier, config.classifier.clone())?
                .with_prompt(prompt),
            artifacts: config.output_dir.clone().map(ArtifactWriter::new),
            owners: config.owners.iter().map(|o| o.label.clone()).collect(),
            capacity: config.capacity.clone(),
        })
    }

    /// Artifact writer, when an output directory is configured
    pub fn artifacts(&self) -> Option<&ArtifactWriter> {
        self.artifacts.as_ref()
    }

    /// Process an existing item set as a run of its own
    pub async fn classify_items<K>(
        &self,
        items: BTreeMap<String, Item>,
        sink: &mut K,
    ) -> Result<RunReport, PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        let started = Instant::now();
        let run_id = RunId::new();
        let mut metrics = RunMetrics::new(run_id);
        metrics.fetched = items.len();
        metrics.unique_items = items.len();
        info!("Run {} classifying {} items", run_id.short(), items.len());

        self.process(run_id, items, metrics, started, sink).await
    }

    async fn process<K>(
        &self,
        run_id: RunId,
        items: BTreeMap<String, Item>,
        mut metrics: RunMetrics,
        started: Instant,
        sink: &mut K,
    ) -> Result<RunReport, PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        let filtered = self.filter.apply(items.values().cloned());
        metrics.record_filter(&filtered);
        info!(
            "Filter kept {} of {} items ({} containers)",
            filtered.kept.len(),
            items.len(),
            filtered.containers
        );

        let run = self.classifier.classify(&filtered.kept).await;
        metrics.record_classification(&run);

        if let Some(writer) = &self.artifacts {
            writer.write_audit(run_id, &run.audits)?;
        }

        let merged = merge_results(run.results);
        metrics.record_results(&merged, &items);
        metrics.assess_workload(self.owners.iter().map(String::as_str), &self.capacity);
        metrics.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        metrics.finish(run.lost_tasks);

        if !metrics.complete {
            warn!(
                "Run {} is partial: {} failed queries, {} salvaged batches, {} items lost",
                run_id.short(),
                metrics.failed_queries,
                metrics.salvaged,
                metrics.lost_items
            );
        }

        sink.accept_results(run_id, &merged.results)
            .map_err(|e| PipelineError::Sink(e.to_string()))?;
        sink.accept_narrative(run_id, &metrics.summary())
            .map_err(|e| PipelineError::Sink(e.to_string()))?;

        info!(
            "Run {} finished: {} results in {}ms",
            run_id.short(),
            metrics.classified,
            metrics.elapsed_ms
        );

        Ok(RunReport {
            run_id,
            metrics,
            items,
            results: merged.results,
            audits: run.audits,
            fetch_failures: Vec::new(),
        })
    }
}

/// Pipeline over an item source and a classifier collaborator
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use tasksift_domain::Item;
/// use tasksift_fetch::MockSource;
/// use tasksift_llm::MockClassifier;
/// use tasksift_pipeline::{MemorySink, Pipeline, PipelineConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let day = NaiveDate::from_ymd_opt(2025, 5, 6).unwrap();
/// let source = MockSource::new(vec![Item::new("1", "Draft lead").with_due(day)]);
/// let config = PipelineConfig {
///     output_dir: None,
///     ..Default::default()
/// };
///
/// let pipeline = Pipeline::new(source, MockClassifier::echo(), config)?;
/// let mut sink = MemorySink::default();
/// let report = pipeline.run(day, &mut sink).await?;
///
/// assert!(report.is_complete());
/// println!("{}", report.metrics.summary());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline<S, C> {
    fetcher: PagedFetcher<S>,
    plan: FetchPlan,
    processor: ItemProcessor<C>,
    config: PipelineConfig,
}

impl<S, C> Pipeline<S, C>
where
    S: ItemSource,
    C: Classifier + 'static,
{
    /// Build every component from `config`
    pub fn new(source: S, classifier: C, config: PipelineConfig) -> Result<Self, PipelineError> {
        let processor = ItemProcessor::new(classifier, &config)?;
        Ok(Self {
            fetcher: PagedFetcher::new(source, config.fetch.clone()),
            plan: FetchPlan::new(config.owners.clone()),
            processor,
            config,
        })
    }

    /// The active configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Artifact writer, when an output directory is configured
    pub fn artifacts(&self) -> Option<&ArtifactWriter> {
        self.processor.artifacts()
    }

    /// Fetch the configured week relative to `today` and process it.
    ///
    /// Fails only when configuration, artifacts or the sink fail, or when
    /// every fetch dimension failed. Anything less is reported as a partial
    /// run.
    pub async fn run<K>(&self, today: NaiveDate, sink: &mut K) -> Result<RunReport, PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        let started = Instant::now();
        let run_id = RunId::new();
        let queries = self.plan.week_queries(today, self.config.week_offset);
        info!(
            "Run {} starting: {} fetch dimensions (week offset {})",
            run_id.short(),
            queries.len(),
            self.config.week_offset
        );

        let outcome =
            fetch_dimensions(&self.fetcher, queries, self.config.fetch.concurrency).await;

        if outcome.queries > 0 && outcome.failures.len() == outcome.queries {
            let first = outcome
                .failures
                .first()
                .map(|(query, e)| format!("{}: {}", query, e))
                .unwrap_or_default();
            return Err(PipelineError::FetchFailed {
                queries: outcome.queries,
                first,
            });
        }

        let mut metrics = RunMetrics::new(run_id);
        metrics.record_fetch(&outcome);
        let fetch_failures = outcome
            .failures
            .iter()
            .map(|(query, e)| format!("{}: {}", query, e))
            .collect();

        if let Some(writer) = self.artifacts() {
            writer.write_items(run_id, outcome.items.values())?;
        }

        let mut report = self
            .processor
            .process(run_id, outcome.items, metrics, started, sink)
            .await?;
        report.fetch_failures = fetch_failures;
        Ok(report)
    }

    /// Process an existing item set, skipping the fetch phase
    pub async fn classify_items<K>(
        &self,
        items: BTreeMap<String, Item>,
        sink: &mut K,
    ) -> Result<RunReport, PipelineError>
    where
        K: ReportSink,
        K::Error: Display,
    {
        self.processor.classify_items(items, sink).await
    }
}
