//! Adaptive batch classification
//!
//! Batches are scheduled as explicit tasks on a [`JoinSet`]. A task makes one
//! classifier call for one contiguous range of the input; when the response
//! fails validation the task reports a split and the coordinator spawns the
//! two halves as new tasks. A shared semaphore bounds calls in flight across
//! every batch and split.

use crate::batching::{bisect, partition};
use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::parser::{salvage, validate};
use crate::prompt::PromptBuilder;
use crate::types::{BatchAudit, BatchOutcome, ClassificationRun, ValidationFailure};
use chrono::Utc;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use tasksift_domain::traits::{Classifier, ClassifyRequest};
use tasksift_domain::{ClassificationResult, Item};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

/// Classifies items in bounded batches, bisecting batches whose responses
/// fail validation and salvaging what it can at the minimum size.
///
/// Classification never fails: the worst case for a batch is an empty
/// result, recorded in the audit trail as a salvage.
pub struct AdaptiveBatchClassifier<C> {
    classifier: Arc<C>,
    config: ClassifierConfig,
    prompt: Arc<PromptBuilder>,
}

/// One unit of scheduled work
#[derive(Debug, Clone)]
struct BatchTask {
    range: Range<usize>,
    depth: u32,
}

/// What the coordinator does after a task finishes
enum Next {
    Results(Vec<ClassificationResult>),
    Split(BatchTask, BatchTask),
}

struct TaskDone {
    start: usize,
    audit: BatchAudit,
    next: Next,
}

/// Everything a task needs, shared across tasks
struct Shared<C> {
    classifier: Arc<C>,
    items: Arc<[Item]>,
    prompt: Arc<PromptBuilder>,
    semaphore: Arc<Semaphore>,
    config: ClassifierConfig,
}

impl<C> Clone for Shared<C> {
    fn clone(&self) -> Self {
        Self {
            classifier: Arc::clone(&self.classifier),
            items: Arc::clone(&self.items),
            prompt: Arc::clone(&self.prompt),
            semaphore: Arc::clone(&self.semaphore),
            config: self.config.clone(),
        }
    }
}

impl<C> AdaptiveBatchClassifier<C>
where
    C: Classifier + 'static,
{
    /// Create a new classifier
    pub fn new(classifier: C, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        Self::from_arc(Arc::new(classifier), config)
    }

    /// Create a classifier sharing an existing collaborator
    pub fn from_arc(classifier: Arc<C>, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        config.validate().map_err(ClassifierError::Config)?;
        Ok(Self {
            classifier,
            config,
            prompt: Arc::new(PromptBuilder::new()),
        })
    }

    /// Use custom instructions
    pub fn with_prompt(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = Arc::new(prompt);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// The underlying collaborator
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Classify `items` in batches of at most `batch_size`.
    ///
    /// Results come back in input order, batch by batch.
    pub async fn classify(&self, items: &[Item]) -> ClassificationRun {
        let ranges = partition(items.len(), self.config.batch_size);
        info!(
            "Classifying {} items in {} batches (batch_size {}, min_batch {})",
            items.len(),
            ranges.len(),
            self.config.batch_size,
            self.config.min_batch
        );
        self.run(items, ranges).await
    }

    /// Classify `items` as a single batch, splitting on failure
    pub async fn classify_batch(&self, items: &[Item]) -> ClassificationRun {
        let ranges = if items.is_empty() {
            Vec::new()
        } else {
            vec![0..items.len()]
        };
        self.run(items, ranges).await
    }

    async fn run(&self, items: &[Item], ranges: Vec<Range<usize>>) -> ClassificationRun {
        let shared = Shared {
            classifier: Arc::clone(&self.classifier),
            items: items.into(),
            prompt: Arc::clone(&self.prompt),
            semaphore: Arc::new(Semaphore::new(self.config.max_in_flight)),
            config: self.config.clone(),
        };

        let mut run = ClassificationRun {
            items: items.len(),
            batches: ranges.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for range in ranges {
            tasks.spawn(run_task(shared.clone(), BatchTask { range, depth: 0 }));
        }

        // Leaves partition the input, so ordering them by start yields input
        // order with every left half ahead of its right half
        let mut leaves: BTreeMap<usize, Vec<ClassificationResult>> = BTreeMap::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => {
                    run.audits.push(done.audit);
                    match done.next {
                        Next::Results(results) => {
                            leaves.insert(done.start, results);
                        }
                        Next::Split(left, right) => {
                            tasks.spawn(run_task(shared.clone(), left));
                            tasks.spawn(run_task(shared.clone(), right));
                        }
                    }
                }
                Err(e) => {
                    warn!("Classification task ended abnormally: {}", e);
                    run.lost_tasks += 1;
                }
            }
        }

        run.audits.sort_by_key(|a| (a.start, a.depth));
        run.results = leaves.into_values().flatten().collect();

        info!(
            "Classified {} of {} items: {} calls, {} splits, {} salvaged",
            run.results.len(),
            run.items,
            run.calls(),
            run.splits(),
            run.salvaged()
        );
        run
    }
}

/// Make one classifier call for `task` and decide what happens next
async fn run_task<C: Classifier>(shared: Shared<C>, task: BatchTask) -> TaskDone {
    let batch = &shared.items[task.range.clone()];
    let request = ClassifyRequest {
        items: batch.to_vec(),
        instructions: shared.prompt.build(batch.len()),
    };

    // The semaphore is never closed
    let permit = shared.semaphore.acquire().await.ok();
    let started = Instant::now();
    let response = timeout(shared.config.timeout(), shared.classifier.submit(&request)).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    drop(permit);

    let audit = |outcome, failure, recovered, raw_response| BatchAudit {
        start: task.range.start,
        size: batch.len(),
        depth: task.depth,
        item_ids: batch.iter().map(|i| i.id.clone()).collect(),
        outcome,
        failure,
        recovered,
        raw_response,
        timestamp: Utc::now(),
        elapsed_ms,
    };

    let (raw, failure) = match response {
        Ok(Ok(raw)) => match validate(&raw, batch) {
            Ok(results) => {
                debug!(
                    "Batch {:?} (depth {}) validated {} results",
                    task.range,
                    task.depth,
                    results.len()
                );
                return TaskDone {
                    start: task.range.start,
                    audit: audit(BatchOutcome::Validated, None, results.len(), Some(raw)),
                    next: Next::Results(results),
                };
            }
            Err(failure) => (Some(raw), failure),
        },
        Ok(Err(e)) => (
            None,
            ValidationFailure::Classifier {
                message: e.to_string(),
            },
        ),
        Err(_) => (
            None,
            ValidationFailure::Timeout {
                limit_secs: shared.config.timeout_secs,
            },
        ),
    };

    let halves = if task.depth < shared.config.max_split_depth {
        bisect(&task.range, shared.config.min_batch)
    } else {
        None
    };

    match halves {
        Some((left, right)) => {
            info!(
                "Batch {:?} failed validation ({}), splitting into {:?} and {:?}",
                task.range, failure, left, right
            );
            let depth = task.depth + 1;
            TaskDone {
                start: task.range.start,
                audit: audit(BatchOutcome::Split, Some(failure), 0, raw),
                next: Next::Split(
                    BatchTask { range: left, depth },
                    BatchTask { range: right, depth },
                ),
            }
        }
        None => {
            let results = raw.as_deref().map(salvage).unwrap_or_default();
            warn!(
                "Batch {:?} failed validation at the floor ({}), salvaged {} of {} results",
                task.range,
                failure,
                results.len(),
                batch.len()
            );
            TaskDone {
                start: task.range.start,
                audit: audit(BatchOutcome::Salvaged, Some(failure), results.len(), raw),
                next: Next::Results(results),
            }
        }
    }
}
