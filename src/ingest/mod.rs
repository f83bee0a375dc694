//! Sheet ingestion pipeline
//!
//! Turns a directory of exported sheets into relational tables in three
//! strictly ordered phases:
//!
//! 1. **Materialize**: every top-level sheet becomes a table with inferred
//!    column types (see [`materialize`])
//! 2. **Link**: capitalized type tokens that name another sheet become
//!    foreign keys (see [`link`])
//! 3. **Consolidate**: each subdirectory of small keyed sheets is merged into
//!    one shared table (see [`consolidate`])
//!
//! A failure never stops a phase. It is recorded in the [`IngestReport`] and
//! the run moves on to the next file, link or directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use sheet_ingest::database::IngestConfig;
//! use sheet_ingest::ingest::run_ingest;
//! use std::path::Path;
//!
//! let root = Path::new("exports");
//! let config = IngestConfig::load(root)?;
//! let report = run_ingest(root, &config)?;
//! println!("{} tables, {} failures", report.tables_created, report.failures.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod consolidate;
pub mod discovery;
pub mod link;
pub mod materialize;
pub mod pipeline;
pub mod reader;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::database::StoreError;
use crate::models::DescriptorError;

pub use consolidate::{Consolidation, SubTableConsolidator, sub_table_descriptor};
pub use discovery::{FileDiscovery, LocalDiscovery};
pub use link::{ForeignKeyLinker, LinkOutcome, LinkSkip, reference_candidates};
pub use materialize::{MaterializedTable, PendingTable, Sheet, TableMaterializer};
pub use pipeline::{Ingestor, run_ingest};
pub use reader::{CsvReader, TabularReader};

/// Errors raised while ingesting one file, link or directory
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Failed to list a directory.
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not valid CSV.
    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// File ends before one of its header rows.
    #[error("{path} has no {row} row")]
    MissingHeader { path: PathBuf, row: &'static str },

    /// Declared type token matches no known type.
    #[error("unknown type token '{token}' for column '{column}'")]
    UnknownTypeToken { column: String, token: String },

    /// Subdirectory yielded no data rows to consolidate.
    #[error("no data rows found for sub-table '{table}'")]
    EmptySubTable { table: String },

    /// Built table definition breaks a descriptor invariant.
    #[error("invalid table definition: {0}")]
    InvalidDescriptor(#[from] DescriptorError),

    /// Store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pipeline phase a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Materialize,
    Link,
    Consolidate,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Materialize => write!(f, "materialize"),
            Phase::Link => write!(f, "link"),
            Phase::Consolidate => write!(f, "consolidate"),
        }
    }
}

/// One recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestFailure {
    pub phase: Phase,
    /// File stem, directory name or member path the failure belongs to
    pub name: String,
    pub message: String,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run
    #[serde(skip)]
    pub duration: Duration,
    /// Top-level sheet files found
    pub files_discovered: usize,
    /// Tables (re)created from top-level sheets
    pub tables_created: usize,
    /// Rows inserted into those tables
    pub rows_inserted: u64,
    /// Foreign keys established
    pub links_created: usize,
    /// Reference candidates that did not pass a link gate
    pub links_skipped: usize,
    /// Referencing values set to NULL before linking
    pub dangling_cleared: u64,
    /// Consolidated sub-tables created
    pub sub_tables_created: usize,
    /// Rows inserted into consolidated sub-tables
    pub sub_table_rows: u64,
    /// Everything that failed, in the order it happened
    pub failures: Vec<IngestFailure>,
}

impl Default for IngestReport {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            duration: Duration::ZERO,
            files_discovered: 0,
            tables_created: 0,
            rows_inserted: 0,
            links_created: 0,
            links_skipped: 0,
            dangling_cleared: 0,
            sub_tables_created: 0,
            sub_table_rows: 0,
            failures: Vec::new(),
        }
    }
}

impl IngestReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and log it
    pub fn record_failure(&mut self, phase: Phase, name: impl Into<String>, error: &dyn std::fmt::Display) {
        let name = name.into();
        let message = error.to_string();
        tracing::warn!("{} failed for {}: {}", phase, name, message);
        self.failures.push(IngestFailure {
            phase,
            name,
            message,
        });
    }

    /// Names of everything that failed, without repeats, in failure order
    pub fn failed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.name) {
                names.push(failure.name.clone());
            }
        }
        names
    }

    /// Whether the run recorded no failures
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }

    /// Format duration as human-readable string
    pub fn duration_string(&self) -> String {
        let secs = self.duration.as_secs();
        if secs < 60 {
            format!("{}.{:03}s", secs, self.duration.subsec_millis())
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else {
            format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_names_are_unique_and_ordered() {
        let mut report = IngestReport::new();
        report.record_failure(Phase::Materialize, "Quest", &"bad token");
        report.record_failure(Phase::Link, "Item", &"store error");
        report.record_failure(Phase::Link, "Quest", &"store error");

        assert_eq!(report.failed_names(), vec!["Quest", "Item"]);
        assert!(!report.is_success());
        assert_eq!(report.failures[1].phase, Phase::Link);
        assert_eq!(report.failures[1].message, "store error");
    }

    #[test]
    fn test_duration_formatting() {
        let mut report = IngestReport::new();

        report.duration = Duration::from_millis(1500);
        assert_eq!(report.duration_string(), "1.500s");

        report.duration = Duration::from_secs(90);
        assert_eq!(report.duration_string(), "1m 30s");

        report.duration = Duration::from_secs(3661);
        assert_eq!(report.duration_string(), "1h 1m 1s");
    }

    #[test]
    fn test_report_serializes_failures() {
        let mut report = IngestReport::new();
        report.record_failure(Phase::Consolidate, "cut_scene", &"no data rows");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["phase"], "consolidate");
        assert_eq!(json["failures"][0]["name"], "cut_scene");
        assert!(json.get("duration").is_none());
    }

    #[test]
    fn test_error_messages() {
        let err = IngestError::UnknownTypeToken {
            column: "count".to_string(),
            token: "float".to_string(),
        };
        assert_eq!(err.to_string(), "unknown type token 'float' for column 'count'");

        let err: IngestError = StoreError::QueryFailed("boom".to_string()).into();
        assert_eq!(err.to_string(), "Query failed: boom");
    }
}
