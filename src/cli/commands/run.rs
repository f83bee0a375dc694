//! Ingestion CLI command

use std::path::PathBuf;

use super::load_config;
use crate::cli::error::CliError;
use crate::ingest::{IngestReport, run_ingest};

/// Run command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Directory holding the exported sheets
    pub input: PathBuf,
    /// Backend override
    pub backend: Option<String>,
    /// SQLite path or PostgreSQL connection string override
    pub database: Option<String>,
    /// Print the report as JSON instead of a summary
    pub json: bool,
}

/// Ingest the input directory and print the outcome
pub fn handle_run(args: &RunArgs) -> Result<IngestReport, CliError> {
    let config = load_config(&args.input, args.backend.as_deref(), args.database.as_deref())?;
    let report = run_ingest(&args.input, &config)?;

    if args.json {
        println!("{}", report_json(&report)?);
    } else {
        println!("{}", summary(&report));
    }

    Ok(report)
}

/// Report as pretty JSON, with the run duration in milliseconds
pub fn report_json(report: &IngestReport) -> Result<String, CliError> {
    let mut value = serde_json::to_value(report)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize report: {}", e)))?;
    if let Some(fields) = value.as_object_mut() {
        fields.insert("duration_ms".to_string(), report.duration_ms().into());
    }
    serde_json::to_string_pretty(&value)
        .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize report: {}", e)))
}

/// Human-readable summary of a report
pub fn summary(report: &IngestReport) -> String {
    let mut lines = vec![
        format!("Ingestion finished in {}", report.duration_string()),
        format!(
            "  Tables:     {} of {} file(s), {} row(s)",
            report.tables_created, report.files_discovered, report.rows_inserted
        ),
        format!(
            "  Links:      {} created, {} skipped, {} dangling value(s) cleared",
            report.links_created, report.links_skipped, report.dangling_cleared
        ),
        format!(
            "  Sub-tables: {} created, {} row(s)",
            report.sub_tables_created, report.sub_table_rows
        ),
    ];

    if !report.failures.is_empty() {
        lines.push(format!("  Failures:   {}", report.failures.len()));
        for failure in &report.failures {
            lines.push(format!(
                "    [{}] {}: {}",
                failure.phase, failure.name, failure.message
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::Phase;

    #[test]
    fn test_summary_lists_failures() {
        let mut report = IngestReport::new();
        report.tables_created = 2;
        report.files_discovered = 3;
        report.record_failure(Phase::Materialize, "Bad", &"unknown type token 'float'");

        let text = summary(&report);
        assert!(text.contains("2 of 3 file(s)"));
        assert!(text.contains("[materialize] Bad: unknown type token 'float'"));
    }

    #[test]
    fn test_report_json_carries_duration() {
        let mut report = IngestReport::new();
        report.duration = std::time::Duration::from_millis(1500);
        report.links_created = 4;

        let value: serde_json::Value = serde_json::from_str(&report_json(&report).unwrap()).unwrap();
        assert_eq!(value["duration_ms"], 1500);
        assert_eq!(value["links_created"], 4);
        assert!(value.get("duration").is_none());
    }

    #[test]
    fn test_summary_without_failures() {
        assert!(!summary(&IngestReport::new()).contains("Failures"));
    }
}
