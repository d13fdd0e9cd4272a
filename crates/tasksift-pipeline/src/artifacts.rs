//! Run artifacts on disk
//!
//! Every file is named `<kind>-<date>-<run>.<ext>` so successive runs sort
//! chronologically:
//!
//! - `items-*.jsonl`: the fetched, de-duplicated items
//! - `audit-*.jsonl`: one record per classifier call, raw response included
//! - `classified-*.json`: the merged id → result map
//! - `summary-*.txt`: the run summary

use crate::error::PipelineError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tasksift_classifier::BatchAudit;
use tasksift_domain::traits::{ClassifiedMap, ReportSink};
use tasksift_domain::{Item, RunId};
use tracing::{debug, info, warn};

/// Writes run artifacts into one directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Write into `dir`, created on first use
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the `kind` artifact for `run_id`, dated by the run's start
    pub fn path_for(&self, kind: &str, run_id: RunId, ext: &str) -> PathBuf {
        let date = run_id.date().format("%Y-%m-%d");
        self.dir
            .join(format!("{}-{}-{}.{}", kind, date, run_id.short(), ext))
    }

    /// Snapshot the fetched items as JSON lines
    pub fn write_items<'a, I>(&self, run_id: RunId, items: I) -> Result<PathBuf, PipelineError>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let path = self.path_for("items", run_id, "jsonl");
        let count = write_jsonl(&path, items)?;
        info!("Wrote {} items to {}", count, path.display());
        Ok(path)
    }

    /// Write one audit record per classifier call as JSON lines
    pub fn write_audit(&self, run_id: RunId, audits: &[BatchAudit]) -> Result<PathBuf, PipelineError> {
        let path = self.path_for("audit", run_id, "jsonl");
        let count = write_jsonl(&path, audits)?;
        info!("Wrote {} audit records to {}", count, path.display());
        Ok(path)
    }

    /// Write the merged result map
    pub fn write_results(&self, run_id: RunId, results: &ClassifiedMap) -> Result<PathBuf, PipelineError> {
        let path = self.path_for("classified", run_id, "json");
        self.ensure_dir()?;
        let file = File::create(&path).map_err(|e| PipelineError::io(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, results)?;
        writer.flush().map_err(|e| PipelineError::io(&path, e))?;
        info!("Wrote {} results to {}", results.len(), path.display());
        Ok(path)
    }

    /// Write the run summary text
    pub fn write_summary(&self, run_id: RunId, summary: &str) -> Result<PathBuf, PipelineError> {
        let path = self.path_for("summary", run_id, "txt");
        self.ensure_dir()?;
        fs::write(&path, summary).map_err(|e| PipelineError::io(&path, e))?;
        Ok(path)
    }

    fn ensure_dir(&self) -> Result<(), PipelineError> {
        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::io(&self.dir, e))
    }
}

impl ReportSink for ArtifactWriter {
    type Error = PipelineError;

    fn accept_results(&mut self, run_id: RunId, results: &ClassifiedMap) -> Result<(), Self::Error> {
        self.write_results(run_id, results).map(|_| ())
    }

    fn accept_narrative(&mut self, run_id: RunId, narrative: &str) -> Result<(), Self::Error> {
        self.write_summary(run_id, narrative).map(|_| ())
    }
}

fn write_jsonl<'a, T, I>(path: &Path, records: I) -> Result<usize, PipelineError>
where
    T: Serialize + 'a,
    I: IntoIterator<Item = &'a T>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n").map_err(|e| PipelineError::io(path, e))?;
        count += 1;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(count)
}

/// Read an items snapshot written by [`ArtifactWriter::write_items`].
///
/// Blank lines are ignored and unparseable lines are skipped with a warning.
/// Later lines replace earlier ones with the same id.
pub fn read_items(path: &Path) -> Result<BTreeMap<String, Item>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut items = BTreeMap::new();
    let mut skipped = 0;

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Item>(&line) {
            Ok(item) if item.has_identity() => {
                items.insert(item.id.clone(), item);
            }
            Ok(_) => skipped += 1,
            Err(e) => {
                debug!("Line {} of {}: {}", number + 1, path.display(), e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("Skipped {} unreadable lines in {}", skipped, path.display());
    }
    Ok(items)
}

/// Sink that keeps everything in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    /// Result maps by run
    pub results: Vec<(RunId, ClassifiedMap)>,
    /// Narratives by run
    pub narratives: Vec<(RunId, String)>,
}

impl ReportSink for MemorySink {
    type Error = PipelineError;

    fn accept_results(&mut self, run_id: RunId, results: &ClassifiedMap) -> Result<(), Self::Error> {
        self.results.push((run_id, results.clone()));
        Ok(())
    }

    fn accept_narrative(&mut self, run_id: RunId, narrative: &str) -> Result<(), Self::Error> {
        self.narratives.push((run_id, narrative.to_string()));
        Ok(())
    }
}
