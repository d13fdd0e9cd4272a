//! Output formatting for the CLI.

use crate::config::{Config, OutputFormat};
use crate::error::{CliError, Result};
use colored::*;
use std::collections::BTreeMap;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};
use tasksift_fetch::OWNER_LABEL_ATTRIBUTE;
use tasksift_pipeline::{LoadStatus, OwnerLoad, RunReport, UNASSIGNED};

/// Titles longer than this are shortened in tables
const TITLE_WIDTH: usize = 48;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a finished run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_report_json(report),
            OutputFormat::Table => Ok(self.format_report_table(report)),
            OutputFormat::Quiet => Ok(self.format_report_quiet(report)),
        }
    }

    fn format_report_json(&self, report: &RunReport) -> Result<String> {
        let json = serde_json::json!({
            "run_id": report.run_id,
            "complete": report.is_complete(),
            "metrics": report.metrics,
            "fetch_failures": report.fetch_failures,
            "results": report.results,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }

    fn format_report_table(&self, report: &RunReport) -> String {
        let mut sections = Vec::new();

        let status = if report.is_complete() {
            self.success(&format!("Run {} complete", report.run_id.short()))
        } else {
            self.warning(&format!("Run {} partial", report.run_id.short()))
        };
        sections.push(status);

        if report.results.is_empty() {
            sections.push(self.colorize("No results.", "yellow"));
        } else {
            let mut builder = Builder::default();
            builder.push_record(["ID", "Title", "Owner", "Category", "Type", "Effort"]);

            for (id, result) in &report.results {
                let item = report.items.get(id);
                let title = item.map(|i| shorten(&i.title)).unwrap_or_default();
                let owner = item
                    .and_then(|i| i.attribute_str(OWNER_LABEL_ATTRIBUTE))
                    .unwrap_or(UNASSIGNED);
                let effort = result
                    .effort_minutes
                    .map(|m| format!("{:.0} min", m))
                    .unwrap_or_else(|| "-".to_string());
                builder.push_record([
                    id.as_str(),
                    title.as_str(),
                    owner,
                    result.category.as_deref().unwrap_or("-"),
                    result.kind.as_deref().unwrap_or("-"),
                    effort.as_str(),
                ]);
            }
            sections.push(self.table(builder));
        }

        if !report.metrics.effort_by_category.is_empty() {
            sections.push(self.tally("Category", &report.metrics.effort_by_category));
        }
        if !report.metrics.effort_by_owner.is_empty() {
            sections.push(self.tally("Owner", &report.metrics.effort_by_owner));
        }

        if !report.metrics.workload.is_empty() {
            sections.push(self.workload(&report.metrics.workload));
        }

        let m = &report.metrics;
        sections.push(self.info(&format!(
            "{} queries ({} failed), {} items, {} containers, {} calls, {} splits, {} salvaged",
            m.queries, m.failed_queries, m.unique_items, m.containers, m.calls, m.splits, m.salvaged
        )));
        for failure in &report.fetch_failures {
            sections.push(self.error(failure));
        }

        sections.join("\n\n")
    }

    fn format_report_quiet(&self, report: &RunReport) -> String {
        format!(
            "{} {}",
            report.run_id,
            if report.is_complete() { "complete" } else { "partial" }
        )
    }

    /// Format the effective configuration.
    pub fn format_config(&self, config: &Config) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(config)?),
            _ => toml::to_string_pretty(config)
                .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e))),
        }
    }

    fn tally(&self, label: &str, minutes: &BTreeMap<String, f64>) -> String {
        let mut builder = Builder::default();
        builder.push_record([label, "Effort"]);
        for (key, value) in minutes {
            builder.push_record([key.clone(), format!("{:.0} min", value)]);
        }
        let total: f64 = minutes.values().sum();
        builder.push_record(["Total".to_string(), format!("{:.0} min", total)]);
        self.table(builder)
    }

    fn workload(&self, loads: &[OwnerLoad]) -> String {
        let mut builder = Builder::default();
        builder.push_record(["#", "Owner", "Effort", "Capacity", "Load", "Deficit", "Status"]);
        for (rank, load) in loads.iter().enumerate() {
            let status = match load.status {
                LoadStatus::Over => self.colorize(&load.status.to_string(), "red"),
                LoadStatus::Near => self.colorize(&load.status.to_string(), "yellow"),
                LoadStatus::Available => self.colorize(&load.status.to_string(), "green"),
            };
            builder.push_record([
                (rank + 1).to_string(),
                load.owner.clone(),
                format!("{:.0} min", load.total_minutes),
                format!("{:.0} min", load.capacity_minutes),
                format!("{:.2}", load.load_ratio),
                format!("{:+.0} min", load.deficit_minutes),
                status,
            ]);
        }
        self.table(builder)
    }

    fn table(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn shorten(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let mut short: String = title.chars().take(TITLE_WIDTH - 1).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksift_domain::{ClassificationResult, Item, RunId};
    use tasksift_pipeline::{CapacityConfig, RunMetrics};

    fn create_test_report(complete: bool) -> RunReport {
        let run_id = RunId::new();
        let item = Item::new("1201", "Draft: lead story").with_attribute(OWNER_LABEL_ATTRIBUTE, "Alex");
        let result = ClassificationResult::new("1201")
            .with_category("Drafting")
            .with_kind("Article")
            .with_effort_minutes(30.0);

        let mut metrics = RunMetrics::new(run_id);
        metrics.queries = 14;
        metrics.effort_by_category.insert("Drafting".to_string(), 30.0);
        metrics.effort_by_owner.insert("Alex".to_string(), 30.0);
        metrics.assess_workload(["Alex"], &CapacityConfig::default());
        metrics.complete = complete;

        RunReport {
            run_id,
            metrics,
            items: [(item.id.clone(), item)].into_iter().collect(),
            results: [(result.id.clone(), result)].into_iter().collect(),
            audits: Vec::new(),
            fetch_failures: if complete {
                Vec::new()
            } else {
                vec!["2025-05-06 owner=u2: Forbidden".to_string()]
            },
        }
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&create_test_report(true)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["complete"], true);
        assert_eq!(value["results"]["1201"]["category"], "Drafting");
        assert_eq!(value["metrics"]["queries"], 14);
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&create_test_report(true)).unwrap();
        assert!(output.contains("complete"));
        assert!(output.contains("Category"));
        assert!(output.contains("Draft: lead story"));
        assert!(output.contains("30 min"));
        assert!(output.contains("Alex"));
        assert!(output.contains("Capacity"));
        assert!(output.contains("-1170 min"));
        assert!(output.contains("available"));
    }

    #[test]
    fn test_partial_run_lists_failures() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&create_test_report(false)).unwrap();
        assert!(output.contains("partial"));
        assert!(output.contains("✗ 2025-05-06 owner=u2: Forbidden"));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let report = create_test_report(true);
        let output = formatter.format_report(&report).unwrap();
        assert_eq!(output, format!("{} complete", report.run_id));
    }

    #[test]
    fn test_config_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_config(&Config::default()).unwrap();
        assert!(output.contains("[pipeline.classifier]"));
        assert!(output.contains("batch_size = 70"));
    }

    #[test]
    fn test_shorten() {
        assert_eq!(shorten("Short"), "Short");
        let long = "x".repeat(60);
        assert_eq!(shorten(&long).chars().count(), TITLE_WIDTH);
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
